//! `nbbctl schema`: create the tables if they do not exist yet.

use anyhow::{Context, Result};
use nbbctl_store::Ingestor;
use tracing::info;

use super::load_db_config;
use crate::ui;

pub async fn run_schema() -> Result<()> {
    let config = load_db_config()?;
    let endpoint = config.endpoint();

    let ingestor = ui::with_spinner_async(
        format!("Initializing schema on {endpoint}"),
        format!("Schema ready on {endpoint}"),
        Ingestor::connect(&config),
    )
    .await
    .context("Failed to initialize the schema")?;

    ingestor.close().await;
    info!(endpoint = %endpoint, "schema initialized");
    Ok(())
}
