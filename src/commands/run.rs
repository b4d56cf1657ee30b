use anyhow::{Context, Result};
use std::sync::Arc;

use fleetcrawl::config::Config;
use fleetcrawl::crawler::{DistributedRunner, HttpFetcher};
use fleetcrawl::metrics;
use fleetcrawl::notifications::{BroadcastNotifier, FanoutNotifier, LogNotifier};

use super::open_store;

/// Run a node until Ctrl-C
pub async fn run(config: Config, print_metrics: bool) -> Result<()> {
    if print_metrics {
        metrics::init_metrics().map_err(|e| anyhow::anyhow!("Failed to initialize metrics: {e}"))?;
    }

    let store = open_store(&config)?;
    let fetcher = Arc::new(HttpFetcher::new(&config.worker).context("Failed to create HTTP client")?);

    let broadcast = Arc::new(BroadcastNotifier::default());
    let notifier = Arc::new(
        FanoutNotifier::new()
            .with(Arc::new(LogNotifier))
            .with(broadcast),
    );

    let runner = DistributedRunner::new(config, store, fetcher, notifier);
    let handle = runner.start().context("Failed to register node")?;

    println!("Node {} running, press Ctrl-C to stop", runner.node_id());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::info!(node_id = %runner.node_id(), "Shutdown requested");
    handle.shutdown().await;

    if print_metrics {
        let text = metrics::encode_metrics().map_err(|e| anyhow::anyhow!("Failed to encode metrics: {e}"))?;
        println!("{text}");
    }

    tracing::info!("fleetcrawl node stopped");
    Ok(())
}
