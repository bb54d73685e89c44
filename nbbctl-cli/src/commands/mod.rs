//! Command implementations for the nbbctl CLI

pub mod check;
pub mod ingest;
pub mod schema;

pub use check::run_check;
pub use ingest::run_ingest;
pub use schema::run_schema;

use anyhow::{Context, Result};
use nbbctl_core::config::load_dotenv;
use nbbctl_core::DbConfig;

/// `.env` discovery followed by the environment lookup.
pub(crate) fn load_db_config() -> Result<DbConfig> {
    load_dotenv();
    DbConfig::from_env().context("Database configuration is incomplete")
}
