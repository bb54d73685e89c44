//! The ingestion context: an explicitly constructed handle owning the
//! pool, with one transaction per record.

use std::future::Future;

use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{error, info, warn};

use nbbctl_core::{DbConfig, Record};

use crate::db::pool::ConnectionPool;
use crate::db::schema;
use crate::db::session::Session;
use crate::dispatch::{self, Report};
use crate::error::{IngestError, StartupError};

/// Running totals for a stream of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Committed with at least one row written
    pub persisted: usize,
    /// Committed but every repository operation was a no-op
    pub skipped: usize,
    /// Rejected before touching the store
    pub dropped: usize,
    /// Rolled back on a store error
    pub failed: usize,
}

impl IngestStats {
    pub fn record(&mut self, outcome: &Result<Report, IngestError>) {
        match outcome {
            Ok(report) if report.is_persisted() => self.persisted += 1,
            Ok(_) => self.skipped += 1,
            Err(err) if err.is_drop() => self.dropped += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.persisted + self.skipped + self.dropped + self.failed
    }
}

#[derive(Clone, Debug)]
pub struct Ingestor {
    pool: ConnectionPool,
}

impl Ingestor {
    /// Open the pool and make sure the schema exists. Every failure here
    /// is fatal for the process.
    pub async fn connect(config: &DbConfig) -> Result<Self, StartupError> {
        info!(endpoint = %config.endpoint(), "connecting");
        let pool = ConnectionPool::connect(config).await?;
        Self::from_pool(pool).await
    }

    /// Use an existing pool; the schema is still initialized.
    pub async fn from_pool(pool: ConnectionPool) -> Result<Self, StartupError> {
        if let Err(err) = schema::initialize(&pool).await {
            pool.close().await;
            return Err(StartupError::Schema(err));
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Ingest one record as its own unit of work.
    ///
    /// Validation happens before a connection is borrowed, so a dropped
    /// record never touches the store. Store errors come back after the
    /// transaction has been rolled back and the connection released.
    pub async fn ingest(&self, record: Record) -> Result<Report, IngestError> {
        let description = record.describe();
        let outcome = self.ingest_inner(record).await;

        match &outcome {
            Ok(_) => {}
            Err(err @ IngestError::Dropped(_)) => warn!(record = %description, "{err}"),
            Err(err) => error!(record = %description, error = %err, "record failed"),
        }
        outcome
    }

    async fn ingest_inner(&self, record: Record) -> Result<Report, IngestError> {
        let record = dispatch::prepare(record)?;
        Session::run(&self.pool, move |session| {
            Box::pin(async move { dispatch::persist(session, &record).await })
        })
        .await
    }

    /// Ingest a stream with at most `concurrency` records in flight.
    /// Per-record failures are counted, never fatal.
    pub async fn ingest_stream<S>(&self, records: S, concurrency: usize) -> IngestStats
    where
        S: Stream<Item = Record>,
    {
        self.ingest_stream_with(records, concurrency, |ingestor, record| {
            ingestor.ingest(record)
        })
        .await
    }

    /// Like [`Ingestor::ingest_stream`], with `op` standing in for
    /// [`Ingestor::ingest`] on every record (for example to retry it).
    pub async fn ingest_stream_with<'a, S, F, Fut>(
        &'a self,
        records: S,
        concurrency: usize,
        mut op: F,
    ) -> IngestStats
    where
        S: Stream<Item = Record>,
        F: FnMut(&'a Ingestor, Record) -> Fut,
        Fut: Future<Output = Result<Report, IngestError>> + 'a,
    {
        records
            .map(|record| op(self, record))
            .buffer_unordered(concurrency.max(1))
            .fold(IngestStats::default(), |mut stats, outcome| async move {
                stats.record(&outcome);
                stats
            })
            .await
    }

    /// Drain and close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
