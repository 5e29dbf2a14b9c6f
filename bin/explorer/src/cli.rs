//! Contains the explorer CLI.

use anyhow::{Context, Result};
use clap::Parser;
use opera_cli::{LogArgs, MetricsArgs, cli_styles, init_tracing_subscriber};
use opera_explorer_service::{ExplorerConfig, ExplorerServiceBuilder, Metrics, shutdown_signal};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// The Opera explorer CLI.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, styles = cli_styles(), long_about = None)]
pub(crate) struct Cli {
    /// Logging arguments.
    #[command(flatten)]
    pub(crate) log: LogArgs,
    /// Prometheus arguments.
    #[command(flatten)]
    pub(crate) metrics: MetricsArgs,
    /// Path to a TOML configuration file.
    #[arg(long, short = 'c', env = "OPERA_CONFIG")]
    pub(crate) config: Option<PathBuf>,
    /// Endpoint of the upstream Opera node. `http(s)` polls, `ws(s)` and IPC subscribe.
    #[arg(long, env = "OPERA_RPC_URL")]
    pub(crate) rpc_url: Option<Url>,
    /// Bound on upstream calls, in seconds.
    #[arg(long, env = "OPERA_RPC_TIMEOUT")]
    pub(crate) rpc_timeout: Option<u64>,
    /// Bound on store calls, in seconds.
    #[arg(long, env = "OPERA_DB_TIMEOUT")]
    pub(crate) db_timeout: Option<u64>,
    /// Capacity of the block buffer.
    #[arg(long, env = "OPERA_BLOCK_BUFFER_SIZE")]
    pub(crate) block_buffer_size: Option<usize>,
    /// Capacity of the recent transactions buffer.
    #[arg(long, env = "OPERA_RECENT_TRANSACTIONS_SIZE")]
    pub(crate) recent_transactions_size: Option<usize>,
    /// Persist per-transaction rows.
    #[arg(long, env = "OPERA_PERSIST_TRANSACTIONS")]
    pub(crate) persist_transactions: bool,
}

impl Cli {
    /// Runs the explorer until a shutdown signal.
    pub(crate) fn run(self) -> Result<()> {
        init_tracing_subscriber(&self.log)?;
        if self.metrics.init_metrics()? {
            Metrics::init();
        }

        let config = self.explorer_config()?;
        Self::tokio_runtime()?.block_on(Self::start(config))
    }

    async fn start(config: ExplorerConfig) -> Result<()> {
        let mut service = ExplorerServiceBuilder::new(config)
            .build()
            .await
            .context("failed to build the explorer")?;
        service.start().await.context("failed to start the explorer")?;

        shutdown_signal().await;
        service.close().await;
        Ok(())
    }

    /// Loads the configuration file, if any, and applies the flag overrides.
    pub(crate) fn explorer_config(&self) -> Result<ExplorerConfig> {
        let config = match &self.config {
            Some(path) => load_config(path)?,
            None => ExplorerConfig::default(),
        };
        let config = self.apply_overrides(config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, mut config: ExplorerConfig) -> ExplorerConfig {
        if let Some(url) = &self.rpc_url {
            config.rpc_url = Some(url.clone());
        }
        if let Some(secs) = self.rpc_timeout {
            config.rpc_timeout_secs = secs;
        }
        if let Some(secs) = self.db_timeout {
            config.db_timeout_secs = secs;
        }
        if let Some(size) = self.block_buffer_size {
            config.block_buffer_size = size;
        }
        if let Some(size) = self.recent_transactions_size {
            config.recent_transactions_size = size;
        }
        if self.persist_transactions {
            config.is_persisted = true;
        }
        config
    }

    /// Creates a new default tokio multi-thread runtime with all features enabled.
    fn tokio_runtime() -> std::io::Result<tokio::runtime::Runtime> {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    }
}

fn load_config(path: &Path) -> Result<ExplorerConfig> {
    debug!(target: "explorer", path = %path.display(), "Loading config file");
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    info!(target: "explorer", path = %path.display(), "Loaded config file");
    Ok(config)
}
