//! Game repository

use sqlx::PgConnection;

use nbbctl_core::GameRecord;

use super::{precondition, Applied};
use crate::error::{StoreError, StoreResult};

pub(crate) const UPSERT_GAME: &str = r#"
    INSERT INTO games (
        id, game_date, game_time,
        home_team_id, away_team_id, home_team_score, away_team_score,
        round, stage, season, arena, link
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ON CONFLICT (id) DO UPDATE
    SET game_date = EXCLUDED.game_date,
        game_time = EXCLUDED.game_time,
        home_team_id = EXCLUDED.home_team_id,
        away_team_id = EXCLUDED.away_team_id,
        home_team_score = EXCLUDED.home_team_score,
        away_team_score = EXCLUDED.away_team_score,
        round = EXCLUDED.round,
        stage = EXCLUDED.stage,
        season = EXCLUDED.season,
        arena = EXCLUDED.arena,
        link = EXCLUDED.link
"#;

pub struct GameRepo<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> GameRepo<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert or update a game. Both teams, when given, must exist.
    pub async fn upsert(&mut self, game: &GameRecord) -> StoreResult<Applied> {
        let missing = game.missing_keys();
        if let Some(skipped) = precondition("games", missing, || format!("{game:?}")) {
            return Ok(skipped);
        }

        sqlx::query(UPSERT_GAME)
            .bind(game.game_id)
            .bind(game.game_date)
            .bind(game.game_time)
            .bind(game.home_team_id.as_deref())
            .bind(game.away_team_id.as_deref())
            .bind(game.home_team_score)
            .bind(game.away_team_score)
            .bind(game.round.as_deref())
            .bind(game.stage.as_deref())
            .bind(game.season.as_deref())
            .bind(game.arena.as_deref())
            .bind(game.link.as_deref())
            .execute(&mut *self.conn)
            .await
            .map_err(|err| StoreError::writing("games", err))?;

        Ok(Applied::Written)
    }
}
