//! Team repository

use sqlx::PgConnection;

use nbbctl_core::TeamRecord;

use super::{precondition, Applied};
use crate::error::{StoreError, StoreResult};

pub(crate) const UPSERT_TEAM: &str = r#"
    INSERT INTO teams (id, name, logo)
    VALUES ($1, $2, $3)
    ON CONFLICT (id) DO UPDATE
    SET name = EXCLUDED.name,
        logo = EXCLUDED.logo
"#;

pub struct TeamRepo<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> TeamRepo<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert or update a team. `team.id` must already be derived.
    pub async fn upsert(&mut self, team: &TeamRecord) -> StoreResult<Applied> {
        let missing = team.missing_keys();
        if let Some(skipped) = precondition("teams", missing, || format!("{team:?}")) {
            return Ok(skipped);
        }

        sqlx::query(UPSERT_TEAM)
            .bind(team.id.as_deref())
            .bind(team.name.as_deref())
            .bind(team.logo.as_deref())
            .execute(&mut *self.conn)
            .await
            .map_err(|err| StoreError::writing("teams", err))?;

        Ok(Applied::Written)
    }
}
