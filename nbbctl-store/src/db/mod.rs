//! Database layer - connection pool, schema, sessions and repositories
//!
//! # Design Principles
//!
//! - One transaction per record; the session owns commit and rollback
//! - Rely on DB constraints (primary and foreign keys), no check-then-insert
//! - Upserts via ON CONFLICT so re-ingestion converges instead of duplicating

pub mod pool;
pub mod repos;
pub mod schema;
pub mod session;

pub use pool::{ConnectionPool, PoolStatus, PooledConnection};
pub use repos::*;
pub use session::Session;
