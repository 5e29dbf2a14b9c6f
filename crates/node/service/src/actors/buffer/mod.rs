//! The [`BufferActor`] and its client.

mod actor;
pub use actor::{BufferActor, BufferConfig, BufferRequest};

mod client;
#[cfg(any(test, feature = "test-utils"))]
pub use client::MockBufferClient;
pub use client::{BufferClient, BufferClientError, QueuedBufferClient};
