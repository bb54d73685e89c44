//! Typed candidate records handed over by the extraction stage.
//!
//! Every field is optional: extraction may leave gaps, and the decision
//! about which gaps are fatal for a record belongs to the ingestion layer.
//! Each record knows which of its fields are required keys for the tables
//! it feeds (`missing_*` methods), so presence checks stay explicit.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// The entity kinds accepted on the record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Team,
    Player,
    Game,
    Shot,
    PlayerStat,
    PlayByPlay,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Team,
        EntityKind::Player,
        EntityKind::Game,
        EntityKind::Shot,
        EntityKind::PlayerStat,
        EntityKind::PlayByPlay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Team => "team",
            EntityKind::Player => "player",
            EntityKind::Game => "game",
            EntityKind::Shot => "shot",
            EntityKind::PlayerStat => "player_stat",
            EntityKind::PlayByPlay => "play_by_play",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the record stream, tagged by `"kind"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Team(TeamRecord),
    Player(PlayerRecord),
    Game(GameRecord),
    Shot(ShotRecord),
    PlayerStat(PlayerStatRecord),
    PlayByPlay(PlayByPlayRecord),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Team(_) => EntityKind::Team,
            Record::Player(_) => EntityKind::Player,
            Record::Game(_) => EntityKind::Game,
            Record::Shot(_) => EntityKind::Shot,
            Record::PlayerStat(_) => EntityKind::PlayerStat,
            Record::PlayByPlay(_) => EntityKind::PlayByPlay,
        }
    }

    /// Union of the keys every repository operation for this record needs.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        match self {
            Record::Team(t) => t.missing_keys(),
            Record::Player(p) => {
                let mut keys = p.missing_player_keys();
                for key in p.missing_season_keys() {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                keys
            }
            Record::Game(g) => g.missing_keys(),
            Record::Shot(s) => s.missing_keys(),
            Record::PlayerStat(s) => s.missing_keys(),
            Record::PlayByPlay(p) => p.missing_keys(),
        }
    }

    /// Short identifying description for log lines.
    pub fn describe(&self) -> String {
        fn opt<T: fmt::Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string())
        }

        match self {
            Record::Team(t) => format!("team id={} logo={}", opt(&t.id), opt(&t.logo)),
            Record::Player(p) => format!(
                "player id={} team={} season={}",
                opt(&p.player_id),
                opt(&p.player_team_id),
                opt(&p.season)
            ),
            Record::Game(g) => format!("game id={}", opt(&g.game_id)),
            Record::Shot(s) => format!(
                "shot player={} game={}",
                opt(&s.player_id),
                opt(&s.game_id)
            ),
            Record::PlayerStat(s) => format!(
                "player_stat player={} game={} quarter={}",
                opt(&s.player_id),
                opt(&s.game_id),
                opt(&s.quarter)
            ),
            Record::PlayByPlay(p) => format!(
                "play_by_play game={} quarter={}",
                opt(&p.game_id),
                opt(&p.quarter)
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    /// Derived from `logo` during ingestion; any incoming value is replaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub logo: Option<String>,
}

impl TeamRecord {
    pub fn missing_keys(&self) -> Vec<&'static str> {
        missing(&[("id", has_text(&self.id))])
    }
}

/// A player as listed on a game roster: identity plus the team and
/// jersey number for one season.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player_id: Option<i32>,
    pub player_name: Option<String>,
    #[serde(alias = "player_photo")]
    pub player_icon_url: Option<String>,
    pub player_team_id: Option<String>,
    pub season: Option<String>,
    pub player_number: Option<String>,
}

impl PlayerRecord {
    /// Keys required by the `players` upsert.
    pub fn missing_player_keys(&self) -> Vec<&'static str> {
        missing(&[("player_id", self.player_id.is_some())])
    }

    /// Keys required by the `player_teams_by_season` upsert.
    pub fn missing_season_keys(&self) -> Vec<&'static str> {
        missing(&[
            ("player_id", self.player_id.is_some()),
            ("player_team_id", has_text(&self.player_team_id)),
            ("season", has_text(&self.season)),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(alias = "id")]
    pub game_id: Option<i32>,
    pub game_date: Option<NaiveDate>,
    #[serde(default, with = "clock")]
    pub game_time: Option<NaiveTime>,
    pub home_team_id: Option<String>,
    pub away_team_id: Option<String>,
    pub home_team_score: Option<i32>,
    pub away_team_score: Option<i32>,
    pub round: Option<String>,
    pub stage: Option<String>,
    pub season: Option<String>,
    pub arena: Option<String>,
    pub link: Option<String>,
}

impl GameRecord {
    pub fn missing_keys(&self) -> Vec<&'static str> {
        missing(&[("game_id", self.game_id.is_some())])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub player_id: Option<i32>,
    pub game_id: Option<i32>,
    pub team_id: Option<String>,
    pub shot_quarter: Option<String>,
    #[serde(default, with = "clock")]
    pub shot_time: Option<NaiveTime>,
    pub shot_type: Option<String>,
    pub shot_x_location: Option<f64>,
    pub shot_y_location: Option<f64>,
}

impl ShotRecord {
    pub fn missing_keys(&self) -> Vec<&'static str> {
        missing(&[
            ("player_id", self.player_id.is_some()),
            ("game_id", self.game_id.is_some()),
            ("team_id", has_text(&self.team_id)),
        ])
    }
}

/// Box-score line for one player in one quarter of one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatRecord {
    pub player_id: Option<i32>,
    pub game_id: Option<i32>,
    pub team_id: Option<String>,
    pub quarter: Option<String>,
    pub minutes_played: Option<f64>,
    pub assist: Option<i32>,
    pub points_attempts: Option<i32>,
    pub points_made: Option<i32>,
    pub defensive_rebounds: Option<i32>,
    pub offensive_rebounds: Option<i32>,
    pub three_points_attempts: Option<i32>,
    pub three_points_made: Option<i32>,
    pub two_points_attempts: Option<i32>,
    pub two_points_made: Option<i32>,
    pub free_throws_attempts: Option<i32>,
    pub free_throws_made: Option<i32>,
    pub steals: Option<i32>,
    pub blocks: Option<i32>,
    pub fouls_committed: Option<i32>,
    pub fouls_received: Option<i32>,
    pub total_errors: Option<i32>,
    pub dunks: Option<i32>,
    pub plus_minus_while_on_court: Option<i32>,
    pub efficiency: Option<i32>,
}

impl PlayerStatRecord {
    pub fn missing_keys(&self) -> Vec<&'static str> {
        missing(&[
            ("player_id", self.player_id.is_some()),
            ("game_id", self.game_id.is_some()),
            ("team_id", has_text(&self.team_id)),
            ("quarter", has_text(&self.quarter)),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayByPlayRecord {
    pub game_id: Option<i32>,
    pub player_id: Option<i32>,
    pub team_id: Option<String>,
    #[serde(default, with = "clock")]
    pub quarter_time: Option<NaiveTime>,
    pub quarter: Option<String>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub play: Option<String>,
}

impl PlayByPlayRecord {
    pub fn missing_keys(&self) -> Vec<&'static str> {
        missing(&[
            ("game_id", self.game_id.is_some()),
            ("quarter", has_text(&self.quarter)),
            ("home_score", self.home_score.is_some()),
            ("away_score", self.away_score.is_some()),
            ("play", has_text(&self.play)),
        ])
    }
}

/// Blank strings are as good as absent for key fields.
fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn missing(checks: &[(&'static str, bool)]) -> Vec<&'static str> {
    checks
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect()
}

/// Clock times as written by the extractor: `HH:MM` or `HH:MM:SS`.
mod clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.format("%H:%M:%S").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid clock time '{raw}'")))
    }
}
