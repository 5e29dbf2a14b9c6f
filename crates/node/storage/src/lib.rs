#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
pub use error::StorageError;

mod models;
pub use models::{BlockRecord, TokensRequest, TransactionRecord};

mod traits;
#[cfg(any(test, feature = "test-utils"))]
pub use traits::MockAggregationStorage;
pub use traits::{
    AggregationStorage, BlockStorage, ExplorerStore, TokensRequestStorage, TransactionStorage,
    TtfStorage,
};

pub mod aggregation;

mod memory;
pub use memory::{DEFAULT_MAX_BLOCKS, InMemoryStore};

mod metadata;
pub use metadata::{Metadata, MetadataStore};
