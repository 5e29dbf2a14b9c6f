use opera_storage::MetadataStore;
use std::fmt::Debug;

/// The metric cells refreshed by the [`crate::MetadataObserverActor`].
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait MetadataWriter: Debug + Send + Sync {
    /// Publishes the number of accounts.
    fn set_num_of_accounts(&self, value: u64);

    /// Publishes the disk size per 100M transactions.
    fn set_disk_size_per_100m_txs(&self, value: u64);

    /// Publishes the pruned disk size per 100M transactions.
    fn set_disk_size_pruned_per_100m_txs(&self, value: u64);

    /// Publishes the time to finality.
    fn set_time_to_finality(&self, value: f64);

    /// Publishes the time to block.
    fn set_time_to_block(&self, value: f64);

    /// Publishes the idle flag.
    fn set_is_idle(&self, value: bool);

    /// Returns the number of blocks ingested so far.
    fn ingested_blocks(&self) -> u64;
}

impl MetadataWriter for MetadataStore {
    fn set_num_of_accounts(&self, value: u64) {
        Self::set_num_of_accounts(self, value);
    }

    fn set_disk_size_per_100m_txs(&self, value: u64) {
        Self::set_disk_size_per_100m_txs(self, value);
    }

    fn set_disk_size_pruned_per_100m_txs(&self, value: u64) {
        Self::set_disk_size_pruned_per_100m_txs(self, value);
    }

    fn set_time_to_finality(&self, value: f64) {
        Self::set_time_to_finality(self, value);
    }

    fn set_time_to_block(&self, value: f64) {
        Self::set_time_to_block(self, value);
    }

    fn set_is_idle(&self, value: bool) {
        Self::set_is_idle(self, value);
    }

    fn ingested_blocks(&self) -> u64 {
        Self::ingested_blocks(self)
    }
}
