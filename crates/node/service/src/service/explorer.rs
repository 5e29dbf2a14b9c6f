//! Contains the [`ExplorerService`].

use super::util::Component;
use crate::{
    BLOCK_CHANNEL_CAPACITY, BlockObserverActor, BlockScannerActor, BufferActor, ComponentState,
    ExplorerConfig, ExplorerQueries, MetadataObserverActor, ServiceError,
};
use opera_providers_alloy::UpstreamClient;
use opera_providers_meta::MetaFetcher;
use opera_storage::{ExplorerStore, MetadataStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The running explorer.
///
/// Owns the upstream client, the store and the metadata cells, and supervises the actors:
///
/// - the [`BufferActor`], owner of the in-memory views,
/// - the [`BlockScannerActor`], following the head feed,
/// - the [`BlockObserverActor`], ingesting the scanned blocks,
/// - the [`MetadataObserverActor`], refreshing the fleet metrics.
///
/// Components are started in that order and stopped in reverse.
#[derive(Debug)]
pub struct ExplorerService {
    config: ExplorerConfig,
    upstream: Arc<dyn UpstreamClient>,
    fetcher: Arc<dyn MetaFetcher>,
    store: Arc<dyn ExplorerStore>,
    metadata: Arc<MetadataStore>,
    components: Vec<Component>,
}

impl ExplorerService {
    /// Creates a new, not yet started, [`ExplorerService`].
    pub fn new(
        config: ExplorerConfig,
        upstream: Arc<dyn UpstreamClient>,
        fetcher: Arc<dyn MetaFetcher>,
        store: Arc<dyn ExplorerStore>,
        metadata: Arc<MetadataStore>,
    ) -> Self {
        Self { config, upstream, fetcher, store, metadata, components: Vec::new() }
    }

    /// Returns the explorer configuration.
    pub const fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Returns the metadata cells.
    pub fn metadata(&self) -> Arc<MetadataStore> {
        Arc::clone(&self.metadata)
    }

    /// Checks the upstream and starts every component.
    ///
    /// An unreachable upstream is fatal: nothing is started and the error is returned.
    pub async fn start(&mut self) -> Result<ExplorerQueries, ServiceError> {
        if !self.components.is_empty() {
            return Err(ServiceError::AlreadyStarted);
        }
        let buffer_config = self.config.buffer_config()?;

        let network_id = self.upstream.network_id().await?;
        info!(target: "explorer", network_id, "Connected to upstream node");

        let cancellation = CancellationToken::new();
        let (buffer, buffer_actor) = BufferActor::new(buffer_config, cancellation.clone());
        self.components.push(Component::spawn(buffer_actor, cancellation));
        let buffer = Arc::new(buffer);

        let (blocks_tx, blocks_rx) = mpsc::channel(BLOCK_CHANNEL_CAPACITY);

        let cancellation = CancellationToken::new();
        let scanner = BlockScannerActor::new(
            Arc::clone(&self.upstream),
            self.upstream.subscribe_heads(),
            blocks_tx,
            cancellation.clone(),
        );
        self.components.push(Component::spawn(scanner, cancellation));

        let cancellation = CancellationToken::new();
        let observer = BlockObserverActor::new(
            blocks_rx,
            buffer.clone(),
            Arc::clone(&self.upstream),
            Arc::clone(&self.store),
            Arc::clone(&self.metadata),
            cancellation.clone(),
        )
        .with_config(self.config.observer_config());
        self.components.push(Component::spawn(observer, cancellation));

        let cancellation = CancellationToken::new();
        let metadata = MetadataObserverActor::new(
            Arc::clone(&self.fetcher),
            self.metadata.clone(),
            Arc::clone(&self.store),
            cancellation.clone(),
        )
        .with_max_ttf_count(self.config.max_ttf_count)
        .with_db_timeout(self.config.db_timeout());
        self.components.push(Component::spawn(metadata, cancellation));

        info!(target: "explorer", components = self.components.len(), "Explorer started");

        Ok(ExplorerQueries::new(
            buffer,
            Arc::clone(&self.upstream),
            Arc::clone(&self.store),
            Arc::clone(&self.metadata),
        ))
    }

    /// Returns the state of every started component, in start order.
    pub fn states(&self) -> Vec<(&'static str, ComponentState)> {
        self.components.iter().map(|c| (c.name, *c.state.borrow())).collect()
    }

    /// Stops every component in reverse start order, then closes the upstream.
    ///
    /// A closed service is not restarted.
    pub async fn close(&mut self) {
        info!(target: "explorer", "Shutting down explorer");
        for component in self.components.iter_mut().rev() {
            debug!(target: "explorer", component = component.name, "Stopping component");
            component.stop().await;
        }
        self.upstream.close();
        info!(target: "explorer", "Explorer stopped");
    }
}
