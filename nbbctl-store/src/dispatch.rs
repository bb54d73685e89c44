//! Ingestion dispatcher
//!
//! A record moves through `received -> validated -> key-derived ->
//! persisted`, or stops at `rejected` (dropped before any store access) or
//! `failed` (store error, the enclosing session rolls back). The
//! dispatcher never commits; that belongs to the session.

use nbbctl_core::{keys, EntityKind, Record};
use tracing::{debug, instrument};

use crate::db::repos::{
    Applied, GameRepo, PlayByPlayRepo, PlayerRepo, PlayerStatRepo, ShotRepo, TeamRepo,
};
use crate::db::session::Session;
use crate::error::IngestError;

/// One repository operation and its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWrite {
    pub table: &'static str,
    pub applied: Applied,
}

/// Everything one record did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub kind: EntityKind,
    pub writes: Vec<TableWrite>,
}

impl Report {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            writes: Vec::new(),
        }
    }

    fn push(&mut self, table: &'static str, applied: Applied) {
        self.writes.push(TableWrite { table, applied });
    }

    /// At least one row was written.
    pub fn is_persisted(&self) -> bool {
        self.writes.iter().any(|w| w.applied.is_written())
    }
}

/// Validate a record and fill in derived keys.
///
/// Fails with [`IngestError::Dropped`] when the record can never be
/// stored: a team without a logo has no id, a player without an id
/// identifies nobody.
pub fn prepare(record: Record) -> Result<Record, IngestError> {
    match record {
        Record::Team(mut team) => {
            let id = team
                .logo
                .as_deref()
                .and_then(keys::team_id_from_logo)
                .ok_or_else(|| {
                    IngestError::dropped(EntityKind::Team, "no logo URL to derive the team id from")
                })?;
            team.id = Some(id);
            Ok(Record::Team(team))
        }
        Record::Player(player) if player.player_id.is_none() => Err(IngestError::dropped(
            EntityKind::Player,
            "no player_id",
        )),
        other => Ok(other),
    }
}

/// Route a prepared record to its repository operations on `session`.
#[instrument(skip_all, fields(kind = %record.kind()))]
pub async fn persist(session: &mut Session, record: &Record) -> Result<Report, IngestError> {
    let mut report = Report::new(record.kind());

    match record {
        Record::Team(team) => {
            let applied = TeamRepo::new(session.conn()).upsert(team).await?;
            report.push("teams", applied);
        }
        Record::Player(player) => {
            let mut repo = PlayerRepo::new(session.conn());
            let applied = repo.upsert(player).await?;
            report.push("players", applied);
            let applied = repo.upsert_team_season(player).await?;
            report.push("player_teams_by_season", applied);
        }
        Record::Game(game) => {
            let applied = GameRepo::new(session.conn()).upsert(game).await?;
            report.push("games", applied);
        }
        Record::PlayerStat(stat) => {
            let applied = PlayerStatRepo::new(session.conn()).upsert(stat).await?;
            report.push("player_stats", applied);
        }
        Record::Shot(shot) => {
            let applied = ShotRepo::new(session.conn()).insert(shot).await?;
            report.push("shots", applied);
        }
        Record::PlayByPlay(play) => {
            let applied = PlayByPlayRepo::new(session.conn()).insert(play).await?;
            report.push("play_by_play", applied);
        }
    }

    debug!(writes = report.writes.len(), "record dispatched");
    Ok(report)
}

/// `prepare` followed by `persist`, for callers that already hold a session.
pub async fn dispatch(session: &mut Session, record: Record) -> Result<Report, IngestError> {
    let record = prepare(record)?;
    persist(session, &record).await
}
