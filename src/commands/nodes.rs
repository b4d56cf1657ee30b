use anyhow::Result;

use fleetcrawl::config::Config;
use fleetcrawl::coordinator::NodeRegistry;

use super::open_store;

fn registry(config: &Config) -> Result<NodeRegistry> {
    Ok(NodeRegistry::new(open_store(config)?, &config.cluster))
}

pub fn overview(config: &Config) -> Result<()> {
    let stats = registry(config)?.cluster_overview()?;
    println!("{}", stats.display());
    Ok(())
}

pub fn reset(config: &Config) -> Result<()> {
    let removed = registry(config)?.reset_nodes()?;
    println!("Removed {removed} node records");
    Ok(())
}
