//! Per-quarter player statistics repository

use sqlx::PgConnection;

use nbbctl_core::PlayerStatRecord;

use super::{precondition, Applied};
use crate::error::{StoreError, StoreResult};

pub(crate) const UPSERT_PLAYER_STAT: &str = r#"
    INSERT INTO player_stats (
        player_id, game_id, team_id, quarter, minutes_played, assist,
        points_attempts, points_made, defensive_rebounds, offensive_rebounds,
        three_points_attempts, three_points_made, two_points_attempts, two_points_made,
        free_throws_attempts, free_throws_made, steals, blocks,
        fouls_committed, fouls_received, total_errors, dunks,
        plus_minus_while_on_court, efficiency
    )
    VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
        $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24
    )
    ON CONFLICT (player_id, game_id, quarter) DO UPDATE
    SET team_id = EXCLUDED.team_id,
        minutes_played = EXCLUDED.minutes_played,
        assist = EXCLUDED.assist,
        points_attempts = EXCLUDED.points_attempts,
        points_made = EXCLUDED.points_made,
        defensive_rebounds = EXCLUDED.defensive_rebounds,
        offensive_rebounds = EXCLUDED.offensive_rebounds,
        three_points_attempts = EXCLUDED.three_points_attempts,
        three_points_made = EXCLUDED.three_points_made,
        two_points_attempts = EXCLUDED.two_points_attempts,
        two_points_made = EXCLUDED.two_points_made,
        free_throws_attempts = EXCLUDED.free_throws_attempts,
        free_throws_made = EXCLUDED.free_throws_made,
        steals = EXCLUDED.steals,
        blocks = EXCLUDED.blocks,
        fouls_committed = EXCLUDED.fouls_committed,
        fouls_received = EXCLUDED.fouls_received,
        total_errors = EXCLUDED.total_errors,
        dunks = EXCLUDED.dunks,
        plus_minus_while_on_court = EXCLUDED.plus_minus_while_on_court,
        efficiency = EXCLUDED.efficiency
"#;

pub struct PlayerStatRepo<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PlayerStatRepo<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert or replace the stat line for (player, game, quarter).
    pub async fn upsert(&mut self, stat: &PlayerStatRecord) -> StoreResult<Applied> {
        let missing = stat.missing_keys();
        if let Some(skipped) = precondition("player_stats", missing, || format!("{stat:?}")) {
            return Ok(skipped);
        }

        sqlx::query(UPSERT_PLAYER_STAT)
            .bind(stat.player_id)
            .bind(stat.game_id)
            .bind(stat.team_id.as_deref())
            .bind(stat.quarter.as_deref())
            .bind(stat.minutes_played)
            .bind(stat.assist)
            .bind(stat.points_attempts)
            .bind(stat.points_made)
            .bind(stat.defensive_rebounds)
            .bind(stat.offensive_rebounds)
            .bind(stat.three_points_attempts)
            .bind(stat.three_points_made)
            .bind(stat.two_points_attempts)
            .bind(stat.two_points_made)
            .bind(stat.free_throws_attempts)
            .bind(stat.free_throws_made)
            .bind(stat.steals)
            .bind(stat.blocks)
            .bind(stat.fouls_committed)
            .bind(stat.fouls_received)
            .bind(stat.total_errors)
            .bind(stat.dunks)
            .bind(stat.plus_minus_while_on_court)
            .bind(stat.efficiency)
            .execute(&mut *self.conn)
            .await
            .map_err(|err| StoreError::writing("player_stats", err))?;

        Ok(Applied::Written)
    }
}
