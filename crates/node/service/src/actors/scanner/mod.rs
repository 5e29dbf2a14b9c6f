//! The [`BlockScannerActor`].

mod actor;
pub use actor::{BLOCK_CHANNEL_CAPACITY, BlockScannerActor, SCAN_TICK};

mod cursor;
pub use cursor::ScanCursor;

mod error;
pub use error::ScannerError;
