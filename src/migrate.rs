use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::local_store;

/// Create the status table if it does not exist. Safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    local_store::ensure_schema(&pool).await?;

    pool.close().await;
    Ok(())
}
