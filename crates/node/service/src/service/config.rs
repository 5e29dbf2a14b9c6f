//! Configuration of the [`crate::ExplorerService`].

use crate::{BufferConfig, ObserverConfig};
use opera_protocol::{AGGREGATION_RESOLUTION, AGGREGATION_TICKS};
use opera_providers_meta::MetaFetcherConfig;
use serde::{Deserialize, Serialize};
use std::{num::NonZeroUsize, time::Duration};
use thiserror::Error;
use url::Url;

/// An invalid [`ExplorerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No upstream endpoint is configured.
    #[error("missing upstream rpc url")]
    MissingRpcUrl,
    /// A capacity or timeout that must be positive is zero.
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
}

/// Configuration of the explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ExplorerConfig {
    /// The upstream node endpoint. `http(s)` endpoints poll for new heads, `ws(s)` and IPC
    /// endpoints subscribe.
    pub rpc_url: Option<Url>,
    /// Bound on every upstream call, in seconds.
    pub rpc_timeout_secs: u64,
    /// Bound on every store call, in seconds.
    pub db_timeout_secs: u64,
    /// Capacity of the cyclic block buffer.
    pub block_buffer_size: usize,
    /// Capacity of the recent transactions buffer.
    pub recent_transactions_size: usize,
    /// Whether per-transaction rows are persisted.
    pub is_persisted: bool,
    /// Number of transaction rows kept in the store.
    pub max_txs_count: usize,
    /// Number of time-to-finality samples kept in the store.
    pub max_ttf_count: usize,
    /// Number of block records kept by the in-memory store.
    pub max_blocks: usize,
    /// Endpoints of the meta-source.
    pub meta_fetcher: MetaFetcherConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            rpc_timeout_secs: 5,
            db_timeout_secs: 5,
            block_buffer_size: 10_000,
            recent_transactions_size: 10_000,
            is_persisted: false,
            max_txs_count: 100_000,
            max_ttf_count: 10_000,
            max_blocks: opera_storage::DEFAULT_MAX_BLOCKS,
            meta_fetcher: MetaFetcherConfig::default(),
        }
    }
}

impl ExplorerConfig {
    /// Checks the configuration, returning the first problem found.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_url.is_none() {
            return Err(ConfigError::MissingRpcUrl);
        }
        if self.rpc_timeout_secs == 0 {
            return Err(ConfigError::Zero("rpc_timeout_secs"));
        }
        if self.db_timeout_secs == 0 {
            return Err(ConfigError::Zero("db_timeout_secs"));
        }
        if self.block_buffer_size == 0 {
            return Err(ConfigError::Zero("block_buffer_size"));
        }
        if self.recent_transactions_size == 0 {
            return Err(ConfigError::Zero("recent_transactions_size"));
        }
        if self.max_blocks == 0 {
            return Err(ConfigError::Zero("max_blocks"));
        }
        Ok(())
    }

    /// Returns the bound on upstream calls.
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Returns the bound on store calls.
    pub const fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }

    /// Returns the buffer capacities.
    pub fn buffer_config(&self) -> Result<BufferConfig, ConfigError> {
        Ok(BufferConfig {
            blocks: NonZeroUsize::new(self.block_buffer_size)
                .ok_or(ConfigError::Zero("block_buffer_size"))?,
            transactions: NonZeroUsize::new(self.recent_transactions_size)
                .ok_or(ConfigError::Zero("recent_transactions_size"))?,
        })
    }

    /// Returns the observer tunables.
    pub const fn observer_config(&self) -> ObserverConfig {
        ObserverConfig {
            is_persisted: self.is_persisted,
            max_txs_count: self.max_txs_count,
            db_timeout: self.db_timeout(),
            resolution: AGGREGATION_RESOLUTION,
            ticks: AGGREGATION_TICKS,
        }
    }
}
