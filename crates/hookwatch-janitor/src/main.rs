//! One maintenance pass over the hook log directory.
//!
//! Configuration comes from the file named by `HOOKWATCH_CONFIG` (optional)
//! and the `HOOKWATCH_*` environment overrides. Intended to run from cron or
//! a session-end hook.

use anyhow::{Context, Result};
use hookwatch_config::ObserveConfig;
use std::path::PathBuf;
use tracing::{info, warn};

const ENV_CONFIG_PATH: &str = "HOOKWATCH_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hookwatch_observe=info,hookwatch_janitor=info")),
        )
        .init();

    let config_path = std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from);
    let config = ObserveConfig::load(config_path.as_deref())
        .await
        .context("Failed to load hookwatch configuration")?;

    info!(log_dir = %config.log_dir.display(), "Starting log maintenance");
    let report = hookwatch_observe::run_maintenance(&config).await;

    for path in report.compression.failed.iter().chain(&report.prune.failed) {
        warn!(path = %path.display(), "Maintenance skipped file");
    }

    Ok(())
}
