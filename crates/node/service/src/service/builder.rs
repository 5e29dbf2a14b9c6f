//! Contains the builder for the [`ExplorerService`].

use crate::{ExplorerConfig, ExplorerService, ServiceError};
use opera_providers_alloy::{AlloyUpstream, UpstreamClient};
use opera_providers_meta::{HttpMetaFetcher, MetaFetcher};
use opera_storage::{ExplorerStore, InMemoryStore, MetadataStore};
use std::sync::Arc;

/// The [`ExplorerServiceBuilder`] is used to construct an [`ExplorerService`].
///
/// Dependencies that are not provided are built from the [`ExplorerConfig`]: the upstream is
/// dialed at `rpc_url`, the meta-fetcher reads the configured endpoints and the store is an
/// [`InMemoryStore`].
#[derive(Debug, Default)]
pub struct ExplorerServiceBuilder {
    /// The explorer configuration.
    config: ExplorerConfig,
    /// The upstream node client.
    upstream: Option<Arc<dyn UpstreamClient>>,
    /// The meta-source fetcher.
    fetcher: Option<Arc<dyn MetaFetcher>>,
    /// The explorer store.
    store: Option<Arc<dyn ExplorerStore>>,
    /// The metadata store.
    metadata: Option<Arc<MetadataStore>>,
}

impl ExplorerServiceBuilder {
    /// Creates a new [`ExplorerServiceBuilder`] with the given [`ExplorerConfig`].
    pub fn new(config: ExplorerConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// Sets the upstream node client.
    pub fn with_upstream(self, upstream: Arc<dyn UpstreamClient>) -> Self {
        Self { upstream: Some(upstream), ..self }
    }

    /// Sets the meta-source fetcher.
    pub fn with_meta_fetcher(self, fetcher: Arc<dyn MetaFetcher>) -> Self {
        Self { fetcher: Some(fetcher), ..self }
    }

    /// Sets the explorer store.
    pub fn with_store(self, store: Arc<dyn ExplorerStore>) -> Self {
        Self { store: Some(store), ..self }
    }

    /// Sets the metadata store.
    pub fn with_metadata(self, metadata: Arc<MetadataStore>) -> Self {
        Self { metadata: Some(metadata), ..self }
    }

    /// Validates the configuration and builds the [`ExplorerService`], dialing the upstream
    /// if none was provided.
    pub async fn build(self) -> Result<ExplorerService, ServiceError> {
        let Self { config, upstream, fetcher, store, metadata } = self;

        let upstream: Arc<dyn UpstreamClient> = match upstream {
            Some(upstream) => upstream,
            None => {
                config.validate()?;
                let url = config.rpc_url.as_ref().ok_or(crate::ConfigError::MissingRpcUrl)?;
                info!(target: "explorer", %url, "Connecting to upstream node");
                Arc::new(AlloyUpstream::connect(url, config.rpc_timeout()).await?)
            }
        };

        let fetcher: Arc<dyn MetaFetcher> = match fetcher {
            Some(fetcher) => fetcher,
            None => {
                Arc::new(HttpMetaFetcher::new(config.meta_fetcher.clone(), config.rpc_timeout())?)
            }
        };
        let store: Arc<dyn ExplorerStore> = match store {
            Some(store) => store,
            None => Arc::new(InMemoryStore::new(config.max_blocks)),
        };
        let metadata = metadata.unwrap_or_default();

        Ok(ExplorerService::new(config, upstream, fetcher, store, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use opera_providers_alloy::MockUpstreamClient;

    #[tokio::test]
    async fn test_missing_rpc_url() {
        let err = ExplorerServiceBuilder::default().build().await.unwrap_err();
        assert!(matches!(err, ServiceError::Config(ConfigError::MissingRpcUrl)));
    }

    #[tokio::test]
    async fn test_injected_upstream_needs_no_url() {
        let metadata = Arc::new(MetadataStore::new());
        let service = ExplorerServiceBuilder::new(ExplorerConfig::default())
            .with_upstream(Arc::new(MockUpstreamClient::new()))
            .with_metadata(metadata.clone())
            .build()
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&service.metadata(), &metadata));
        assert!(service.states().is_empty());
    }
}
