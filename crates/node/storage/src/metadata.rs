//! Contains the [`MetadataStore`].

use opera_protocol::CountTick;
use parking_lot::RwLock;
use serde::Serialize;

/// A snapshot of the live explorer metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Number of accounts on the network.
    pub num_of_accounts: u64,
    /// Disk size needed per 100M transactions, in bytes.
    pub disk_size_per_100m_txs: u64,
    /// Pruned disk size needed per 100M transactions, in bytes.
    pub disk_size_pruned_per_100m_txs: u64,
    /// Average time to finality, in seconds.
    pub time_to_finality: f64,
    /// Average time between blocks, in seconds.
    pub time_to_block: f64,
    /// Whether the chain stopped producing blocks.
    pub is_idle: bool,
    /// Number of the latest ingested block.
    pub head_number: Option<u64>,
    /// Number of blocks ingested since start.
    pub ingested_blocks: u64,
    /// The end timestamp of the published tick series.
    pub aggregated_at: Option<u64>,
    /// Transactions per bucket over the trailing window.
    pub txs_ticks: Vec<CountTick>,
    /// Gas used per bucket over the trailing window.
    pub gas_ticks: Vec<CountTick>,
}

/// Process-wide holder of the live explorer metrics.
///
/// Every read and write goes through a single reader-writer lock, so readers always observe a
/// consistent [`Metadata`].
#[derive(Debug, Default)]
pub struct MetadataStore {
    inner: RwLock<Metadata>,
}

impl MetadataStore {
    /// Creates an empty [`MetadataStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all metrics.
    pub fn snapshot(&self) -> Metadata {
        self.inner.read().clone()
    }

    /// Returns the number of accounts.
    pub fn num_of_accounts(&self) -> u64 {
        self.inner.read().num_of_accounts
    }

    /// Sets the number of accounts.
    pub fn set_num_of_accounts(&self, value: u64) {
        self.inner.write().num_of_accounts = value;
    }

    /// Returns the disk size per 100M transactions.
    pub fn disk_size_per_100m_txs(&self) -> u64 {
        self.inner.read().disk_size_per_100m_txs
    }

    /// Sets the disk size per 100M transactions.
    pub fn set_disk_size_per_100m_txs(&self, value: u64) {
        self.inner.write().disk_size_per_100m_txs = value;
    }

    /// Returns the pruned disk size per 100M transactions.
    pub fn disk_size_pruned_per_100m_txs(&self) -> u64 {
        self.inner.read().disk_size_pruned_per_100m_txs
    }

    /// Sets the pruned disk size per 100M transactions.
    pub fn set_disk_size_pruned_per_100m_txs(&self, value: u64) {
        self.inner.write().disk_size_pruned_per_100m_txs = value;
    }

    /// Returns the time to finality.
    pub fn time_to_finality(&self) -> f64 {
        self.inner.read().time_to_finality
    }

    /// Sets the time to finality.
    pub fn set_time_to_finality(&self, value: f64) {
        self.inner.write().time_to_finality = value;
    }

    /// Returns the time to block.
    pub fn time_to_block(&self) -> f64 {
        self.inner.read().time_to_block
    }

    /// Sets the time to block.
    pub fn set_time_to_block(&self, value: f64) {
        self.inner.write().time_to_block = value;
    }

    /// Returns the idle flag.
    pub fn is_idle(&self) -> bool {
        self.inner.read().is_idle
    }

    /// Sets the idle flag.
    pub fn set_is_idle(&self, value: bool) {
        self.inner.write().is_idle = value;
    }

    /// Records an ingested block.
    pub fn note_block(&self, number: u64) {
        let mut inner = self.inner.write();
        inner.head_number = Some(number);
        inner.ingested_blocks += 1;
    }

    /// Returns the number of blocks ingested since start.
    pub fn ingested_blocks(&self) -> u64 {
        self.inner.read().ingested_blocks
    }

    /// Returns the published transaction count series.
    pub fn txs_ticks(&self) -> Vec<CountTick> {
        self.inner.read().txs_ticks.clone()
    }

    /// Returns the published gas series.
    pub fn gas_ticks(&self) -> Vec<CountTick> {
        self.inner.read().gas_ticks.clone()
    }

    /// Publishes freshly aggregated series ending at `end`.
    ///
    /// Series older than the published ones are discarded. Returns whether the series were
    /// stored.
    pub fn set_ticks(&self, end: u64, txs: Vec<CountTick>, gas: Vec<CountTick>) -> bool {
        let mut inner = self.inner.write();
        if inner.aggregated_at.is_some_and(|at| at > end) {
            return false;
        }
        inner.aggregated_at = Some(end);
        inner.txs_ticks = txs;
        inner.gas_ticks = gas;
        true
    }
}
