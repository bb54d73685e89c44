//! nbbctl-store: transactional ingestion of NBB records into PostgreSQL
//!
//! Every record is its own unit of work: the [`Ingestor`] validates it,
//! borrows a pooled connection, routes it to the matching repository
//! operations inside a [`Session`], and commits or rolls back.

pub mod db;
pub mod dispatch;
pub mod error;
pub mod ingest;

pub use db::{ConnectionPool, Session};
pub use dispatch::{Report, TableWrite};
pub use error::{DropReason, IngestError, StartupError, StoreError, StoreErrorKind, StoreResult};
pub use ingest::{IngestStats, Ingestor};
