//! Fixed-capacity in-memory buffers backing the explorer's recent views.
//!
//! Neither buffer is thread-safe. They are owned by a single task and accessed through it.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod block;
pub use block::BlockBuffer;

mod recency;
pub use recency::RecencyBuffer;
