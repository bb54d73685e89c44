//! nbbctl-core: typed records and configuration for NBB ingestion
//!
//! Everything here is free of database concerns; `nbbctl-store` builds the
//! transactional ingestion layer on top of these types.

pub mod config;
pub mod error;
pub mod keys;
pub mod ndjson;
pub mod records;

pub use config::{DbConfig, PoolConfig};
pub use error::{CoreError, Result};
pub use keys::team_id_from_logo;
pub use ndjson::{NumberedRecord, RecordReader, RecordWriter};
#[cfg(feature = "rt")]
pub use ndjson::AsyncRecordReader;
pub use records::{
    EntityKind, GameRecord, PlayByPlayRecord, PlayerRecord, PlayerStatRecord, Record, ShotRecord,
    TeamRecord,
};
