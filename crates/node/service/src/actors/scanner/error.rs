use thiserror::Error;

/// The error type for the [`crate::BlockScannerActor`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerError {
    /// The upstream head feed shut down while the scanner was running.
    #[error("head feed closed")]
    HeadFeedClosed,
}
