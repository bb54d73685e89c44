//! Player repository
//!
//! A roster entry yields two rows: the player itself and the player's
//! team and jersey number for one season.

use sqlx::PgConnection;

use nbbctl_core::PlayerRecord;

use super::{precondition, Applied};
use crate::error::{StoreError, StoreResult};

pub(crate) const UPSERT_PLAYER: &str = r#"
    INSERT INTO players (id, player_name, player_icon_url)
    VALUES ($1, $2, $3)
    ON CONFLICT (id) DO UPDATE
    SET player_name = EXCLUDED.player_name,
        player_icon_url = EXCLUDED.player_icon_url
"#;

pub(crate) const UPSERT_TEAM_SEASON: &str = r#"
    INSERT INTO player_teams_by_season (player_id, player_team_id, season, player_number)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (player_id, player_team_id, season) DO UPDATE
    SET player_number = EXCLUDED.player_number
"#;

pub struct PlayerRepo<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PlayerRepo<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert or update the player's name and icon.
    pub async fn upsert(&mut self, player: &PlayerRecord) -> StoreResult<Applied> {
        let missing = player.missing_player_keys();
        if let Some(skipped) = precondition("players", missing, || format!("{player:?}")) {
            return Ok(skipped);
        }

        sqlx::query(UPSERT_PLAYER)
            .bind(player.player_id)
            .bind(player.player_name.as_deref())
            .bind(player.player_icon_url.as_deref())
            .execute(&mut *self.conn)
            .await
            .map_err(|err| StoreError::writing("players", err))?;

        Ok(Applied::Written)
    }

    /// Insert or update the player's jersey number for a team and season.
    /// The player and team rows must exist already.
    pub async fn upsert_team_season(&mut self, player: &PlayerRecord) -> StoreResult<Applied> {
        let missing = player.missing_season_keys();
        if let Some(skipped) =
            precondition("player_teams_by_season", missing, || format!("{player:?}"))
        {
            return Ok(skipped);
        }

        sqlx::query(UPSERT_TEAM_SEASON)
            .bind(player.player_id)
            .bind(player.player_team_id.as_deref())
            .bind(player.season.as_deref())
            .bind(player.player_number.as_deref())
            .execute(&mut *self.conn)
            .await
            .map_err(|err| StoreError::writing("player_teams_by_season", err))?;

        Ok(Applied::Written)
    }
}
