#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod actors;
#[cfg(any(test, feature = "test-utils"))]
pub use actors::{MockBufferClient, MockMetadataWriter};
pub use actors::{
    AGGREGATION_GRACE, BLOCK_CHANNEL_CAPACITY, BlockObserverActor, BlockScannerActor,
    BufferActor, BufferClient, BufferClientError, BufferConfig, BufferRequest, CancellableContext,
    ExplorerActor, IDLE_TICKS, METADATA_TICK, MetadataObserverActor, MetadataWriter,
    ObserverConfig, ObserverError, QueuedBufferClient, SCAN_TICK, SHRINK_EVERY_BLOCKS,
    ScanCursor, ScannerError,
};

mod service;
pub use service::{
    ComponentState, ConfigError, ExplorerConfig, ExplorerService, ExplorerServiceBuilder,
    ServiceError, shutdown_signal,
};

mod queries;
pub use queries::{ExplorerQueries, QueryError};

mod metrics;
pub use metrics::Metrics;
