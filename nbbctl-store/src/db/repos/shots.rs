//! Shot chart repository (append-only)

use sqlx::PgConnection;

use nbbctl_core::ShotRecord;

use super::{precondition, Applied};
use crate::error::{StoreError, StoreResult};

pub(crate) const INSERT_SHOT: &str = r#"
    INSERT INTO shots (
        player_id, game_id, team_id, shot_quarter, shot_time,
        shot_type, shot_x_location, shot_y_location
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

pub struct ShotRepo<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> ShotRepo<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Append a shot. Identical shots ingested twice become two rows.
    pub async fn insert(&mut self, shot: &ShotRecord) -> StoreResult<Applied> {
        let missing = shot.missing_keys();
        if let Some(skipped) = precondition("shots", missing, || format!("{shot:?}")) {
            return Ok(skipped);
        }

        sqlx::query(INSERT_SHOT)
            .bind(shot.player_id)
            .bind(shot.game_id)
            .bind(shot.team_id.as_deref())
            .bind(shot.shot_quarter.as_deref())
            .bind(shot.shot_time)
            .bind(shot.shot_type.as_deref())
            .bind(shot.shot_x_location)
            .bind(shot.shot_y_location)
            .execute(&mut *self.conn)
            .await
            .map_err(|err| StoreError::writing("shots", err))?;

        Ok(Applied::Written)
    }
}
