//! The [`MetadataObserverActor`].

mod actor;
pub use actor::{IDLE_TICKS, METADATA_TICK, MetadataObserverActor};

mod writer;
#[cfg(any(test, feature = "test-utils"))]
pub use writer::MockMetadataWriter;
pub use writer::MetadataWriter;
