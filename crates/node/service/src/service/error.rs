use crate::ConfigError;
use opera_providers_alloy::UpstreamError;
use opera_providers_meta::MetaFetchError;
use thiserror::Error;

/// A fatal error starting the [`crate::ExplorerService`].
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The upstream node cannot be reached.
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] UpstreamError),
    /// The meta-fetcher cannot be built.
    #[error("meta-fetcher unavailable: {0}")]
    MetaFetcher(#[from] MetaFetchError),
    /// The service was already started.
    #[error("explorer service already started")]
    AlreadyStarted,
}
