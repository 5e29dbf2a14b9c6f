#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod block;
pub use block::Block;

mod transaction;
pub use transaction::{RecentTransaction, Transaction, TransactionKind};

mod tick;
pub use tick::{
    AGGREGATION_RESOLUTION, AGGREGATION_TICKS, CountTick, FloatTick, Tick, TtfSample,
    aggregation_bucket, series_timestamps,
};
