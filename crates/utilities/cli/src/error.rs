//! Error types for CLI utilities.

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tracing_subscriber::{filter::ParseError, util::TryInitError};

/// Errors raised while setting up the process.
#[derive(Debug, Error)]
pub enum CliError {
    /// The log filter directives are invalid.
    #[error("invalid log filter: {0}")]
    LogFilter(#[from] ParseError),
    /// A global tracing subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(#[from] TryInitError),
    /// The Prometheus exporter could not be installed.
    #[error("failed to initialize metrics: {0}")]
    Prometheus(#[from] BuildError),
}

/// Type alias for CLI results.
pub type CliResult<T> = Result<T, CliError>;
