//! Error types for nbbctl-store
//!
//! Three families, matching how callers must react:
//! - [`StartupError`]: the process cannot proceed (config, connect, schema).
//! - [`IngestError::Dropped`]: the record was rejected before touching the store.
//! - [`IngestError::Store`]: the unit of work was rolled back; the caller
//!   decides whether to retry or skip the record.

use std::fmt;

use nbbctl_core::{CoreError, EntityKind};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

const SQLSTATE_IN_FAILED_TRANSACTION: &str = "25P02";

/// Classification of a store-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// A referenced row does not exist (SQLSTATE 23503)
    ForeignKeyViolation,
    /// Uniqueness conflict outside the declared conflict target (23505)
    UniqueViolation,
    /// A NOT NULL column received no value (23502)
    NotNullViolation,
    /// Statement issued on a transaction that already failed (25P02)
    FailedTransaction,
    /// Connection lost, pool exhausted or closed, TLS or protocol failure
    Connectivity,
    Other,
}

impl StoreErrorKind {
    pub fn classify(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => {
                if db.code().as_deref() == Some(SQLSTATE_IN_FAILED_TRANSACTION) {
                    return Self::FailedTransaction;
                }
                match db.kind() {
                    sqlx::error::ErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation,
                    sqlx::error::ErrorKind::UniqueViolation => Self::UniqueViolation,
                    sqlx::error::ErrorKind::NotNullViolation => Self::NotNullViolation,
                    _ => Self::Other,
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connectivity,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForeignKeyViolation => "foreign key violation",
            Self::UniqueViolation => "unique violation",
            Self::NotNullViolation => "not-null violation",
            Self::FailedTransaction => "failed transaction",
            Self::Connectivity => "connectivity",
            Self::Other => "store error",
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed statement (or begin/commit) against the store.
#[derive(Error, Debug)]
#[error("{kind} while {action}: {source}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    /// What the session was doing, e.g. `writing games` or `committing`
    pub action: String,
    #[source]
    pub source: sqlx::Error,
}

impl StoreError {
    pub fn new(action: impl Into<String>, source: sqlx::Error) -> Self {
        Self {
            kind: StoreErrorKind::classify(&source),
            action: action.into(),
            source,
        }
    }

    /// Error from a statement writing `table`.
    pub fn writing(table: &str, source: sqlx::Error) -> Self {
        Self::new(format!("writing {table}"), source)
    }

    /// Worth retrying the same record later; constraint failures never are.
    pub fn is_transient(&self) -> bool {
        self.kind == StoreErrorKind::Connectivity
    }
}

/// Why a record was discarded without touching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropReason {
    pub kind: EntityKind,
    pub reason: String,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} record dropped: {}", self.kind, self.reason)
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{0}")]
    Dropped(DropReason),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    pub fn dropped(kind: EntityKind, reason: impl Into<String>) -> Self {
        Self::Dropped(DropReason {
            kind,
            reason: reason.into(),
        })
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Self::Dropped(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_transient())
    }
}

/// Fatal errors while bringing the ingestion layer up.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("could not connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("schema initialization failed: {0}")]
    Schema(#[source] StoreError),
}
