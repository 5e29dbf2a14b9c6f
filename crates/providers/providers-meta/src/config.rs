//! Endpoints of the meta-source.

use serde::{Deserialize, Serialize};
use url::Url;

/// Per-metric endpoints of the meta-source. Every endpoint is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MetaFetcherConfig {
    /// Endpoint publishing the number of accounts.
    pub number_of_accounts_url: Option<Url>,
    /// Endpoint publishing the disk size per 100M transactions.
    pub disk_size_per_100m_txs_url: Option<Url>,
    /// Endpoint publishing the pruned disk size per 100M transactions.
    pub disk_size_pruned_per_100m_txs_url: Option<Url>,
    /// Endpoint publishing the time to finality, in seconds.
    pub time_to_finality_url: Option<Url>,
    /// Endpoint publishing the time to block, in seconds.
    pub time_to_block_url: Option<Url>,
}
