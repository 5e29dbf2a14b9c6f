//! Metrics of the explorer actors.

/// Container for the metric identifiers of the explorer.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Gauge of the latest head announced by the upstream node.
    pub const HEAD_HEIGHT: &'static str = "opera_explorer_head_height";
    /// Gauge of the number of blocks the scanner still has to fetch.
    pub const SCANNER_LAG: &'static str = "opera_explorer_scanner_lag";
    /// Gauge of the number of blocks held by the block buffer.
    pub const BUFFERED_BLOCKS: &'static str = "opera_explorer_buffered_blocks";
    /// Counter of the transactions of every ingested block.
    pub const INGESTED_TRANSACTIONS: &'static str = "opera_explorer_ingested_transactions_total";
    /// Counter of successful aggregation series recomputes.
    pub const AGGREGATION_RECOMPUTES: &'static str = "opera_explorer_aggregation_recomputes_total";
    /// Gauge of the [`crate::ComponentState`] of each component, labeled by component.
    pub const COMPONENT_STATE: &'static str = "opera_explorer_component_state";

    /// Describes and zeroes every explorer metric.
    ///
    /// Call once at startup, after the recorder is installed. A no-op without the `metrics`
    /// feature.
    pub fn init() {
        #[cfg(feature = "metrics")]
        {
            Self::describe();
            Self::zero();
        }
    }

    #[cfg(feature = "metrics")]
    fn describe() {
        metrics::describe_gauge!(
            Self::HEAD_HEIGHT,
            metrics::Unit::Count,
            "The latest block number announced by the upstream node",
        );
        metrics::describe_gauge!(
            Self::SCANNER_LAG,
            metrics::Unit::Count,
            "Blocks between the next block to scan and the scan target",
        );
        metrics::describe_gauge!(
            Self::BUFFERED_BLOCKS,
            metrics::Unit::Count,
            "Blocks held by the in-memory block buffer",
        );
        metrics::describe_counter!(
            Self::INGESTED_TRANSACTIONS,
            metrics::Unit::Count,
            "Transactions of every ingested block",
        );
        metrics::describe_counter!(
            Self::AGGREGATION_RECOMPUTES,
            metrics::Unit::Count,
            "Successful recomputes of the transactions and gas series",
        );
        metrics::describe_gauge!(
            Self::COMPONENT_STATE,
            "Lifecycle state of each component: 0 init, 1 running, 2 stopping, 3 stopped",
        );
    }

    #[cfg(feature = "metrics")]
    fn zero() {
        metrics::gauge!(Self::HEAD_HEIGHT).set(0.0);
        metrics::gauge!(Self::SCANNER_LAG).set(0.0);
        metrics::gauge!(Self::BUFFERED_BLOCKS).set(0.0);
        metrics::counter!(Self::INGESTED_TRANSACTIONS).absolute(0);
        metrics::counter!(Self::AGGREGATION_RECOMPUTES).absolute(0);
    }
}
