//! [ExplorerActor]s of the explorer.
//!
//! ```mermaid
//! flowchart LR
//!
//! up{Upstream}
//! meta{Meta-source}
//! scn[Scanner]
//! obs[Observer]
//! buf[Buffer]
//! md[Metadata observer]
//!
//! up -- heads --> scn
//! scn -- blocks --> obs
//! obs -- add_block --> buf
//! meta --> md
//! ```

mod traits;
pub use traits::{CancellableContext, ExplorerActor};

mod store;

mod buffer;
#[cfg(any(test, feature = "test-utils"))]
pub use buffer::MockBufferClient;
pub use buffer::{
    BufferActor, BufferClient, BufferClientError, BufferConfig, BufferRequest, QueuedBufferClient,
};

mod scanner;
pub use scanner::{BLOCK_CHANNEL_CAPACITY, BlockScannerActor, SCAN_TICK, ScanCursor, ScannerError};

mod observer;
pub use observer::{
    AGGREGATION_GRACE, BlockObserverActor, ObserverConfig, ObserverError, SHRINK_EVERY_BLOCKS,
};

mod metadata;
#[cfg(any(test, feature = "test-utils"))]
pub use metadata::MockMetadataWriter;
pub use metadata::{IDLE_TICKS, METADATA_TICK, MetadataObserverActor, MetadataWriter};
