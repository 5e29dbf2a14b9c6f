//! Errors of the meta-fetcher.

use thiserror::Error;

/// An error fetching a metric from the meta-source.
#[derive(Debug, Error)]
pub enum MetaFetchError {
    /// No endpoint is configured for the metric.
    #[error("no endpoint configured for {0}")]
    NotConfigured(&'static str),
    /// The request failed before a response was received.
    #[error("meta-source request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The meta-source answered with a non-success status.
    #[error("meta-source answered {status} for {metric}")]
    Status {
        /// The metric being fetched.
        metric: &'static str,
        /// The HTTP status code.
        status: u16,
    },
    /// The response body is not a finite number.
    #[error("invalid {metric} value {body:?}")]
    Parse {
        /// The metric being fetched.
        metric: &'static str,
        /// The trimmed response body.
        body: String,
    },
}

impl MetaFetchError {
    /// Returns true if the metric has no endpoint configured.
    pub const fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }
}
