pub mod jobs;
pub mod nodes;
pub mod run;

use anyhow::{Context, Result};
use std::sync::Arc;

use fleetcrawl::config::Config;
use fleetcrawl::storage::SqliteCrawlStore;

/// Open the shared store named by the configuration
pub fn open_store(config: &Config) -> Result<Arc<SqliteCrawlStore>> {
    let path = &config.database.sqlite_path;
    let store = SqliteCrawlStore::new(path, config.busy_timeout())
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    Ok(Arc::new(store))
}
