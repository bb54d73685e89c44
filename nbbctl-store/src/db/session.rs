//! Transactional session: one unit of work on one pooled connection.
//!
//! `Session::begin` borrows a connection and opens a transaction. The
//! session ends exactly one way: `commit`, `rollback`, or `finish` (which
//! picks between them from the unit of work's result). A session dropped
//! without ending (panic, cancelled task) is rolled back by sqlx and its
//! connection returned to the pool, so no path leaks a connection or
//! leaves a partial write behind.

use futures::future::BoxFuture;
use sqlx::{PgConnection, Postgres, Transaction};
use tracing::{debug, error, warn};

use super::pool::ConnectionPool;
use crate::error::StoreError;

pub struct Session {
    tx: Transaction<'static, Postgres>,
}

impl Session {
    /// Borrow a connection from the pool and issue `BEGIN`.
    ///
    /// The transaction owns the pooled connection, so ending or dropping
    /// the session is what releases it.
    pub async fn begin(pool: &ConnectionPool) -> Result<Self, StoreError> {
        let conn = pool.acquire().await?;
        let tx = Transaction::begin(conn, None)
            .await
            .map_err(|err| StoreError::new("beginning a transaction", err))?;
        Ok(Self { tx })
    }

    /// The connection for statements inside this unit of work. The borrow
    /// ends with the session.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|err| StoreError::new("committing", err))?;
        debug!("transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|err| StoreError::new("rolling back", err))
    }

    /// Commit on `Ok`, roll back on `Err`.
    ///
    /// The unit of work's own error is always the one returned; a failed
    /// rollback is only logged (the server discards the transaction when
    /// the connection is reset anyway).
    pub async fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError> + std::fmt::Display,
    {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "rolling back transaction");
                if let Err(rollback_err) = self.rollback().await {
                    error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Run `work` inside a fresh session and finish it.
    ///
    /// ```ignore
    /// Session::run(&pool, |session| Box::pin(async move {
    ///     TeamRepo::new(session.conn()).upsert(&team).await
    /// })).await?;
    /// ```
    pub async fn run<T, E, F>(pool: &ConnectionPool, work: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, E>>,
        E: From<StoreError> + std::fmt::Display,
    {
        let mut session = Session::begin(pool).await?;
        let outcome = work(&mut session).await;
        session.finish(outcome).await
    }
}
