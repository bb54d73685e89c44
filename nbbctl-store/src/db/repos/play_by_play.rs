//! Play-by-play repository (append-only)

use sqlx::PgConnection;

use nbbctl_core::PlayByPlayRecord;

use super::{precondition, Applied};
use crate::error::{StoreError, StoreResult};

pub(crate) const INSERT_PLAY: &str = r#"
    INSERT INTO play_by_play (
        game_id, player_id, team_id, quarter_time, quarter,
        home_score, away_score, play
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

pub struct PlayByPlayRepo<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PlayByPlayRepo<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Append a play. Player and team are optional (e.g. timeouts,
    /// period ends).
    pub async fn insert(&mut self, play: &PlayByPlayRecord) -> StoreResult<Applied> {
        let missing = play.missing_keys();
        if let Some(skipped) = precondition("play_by_play", missing, || format!("{play:?}")) {
            return Ok(skipped);
        }

        sqlx::query(INSERT_PLAY)
            .bind(play.game_id)
            .bind(play.player_id)
            .bind(play.team_id.as_deref())
            .bind(play.quarter_time)
            .bind(play.quarter.as_deref())
            .bind(play.home_score)
            .bind(play.away_score)
            .bind(play.play.as_deref())
            .execute(&mut *self.conn)
            .await
            .map_err(|err| StoreError::writing("play_by_play", err))?;

        Ok(Applied::Written)
    }
}
