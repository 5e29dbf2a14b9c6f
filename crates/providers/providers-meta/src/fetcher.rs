//! The [`MetaFetcher`] trait and its HTTP implementation.

use crate::{MetaFetchError, MetaFetcherConfig};
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, str::FromStr, time::Duration};
use url::Url;

/// Source of fleet-level metrics.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait MetaFetcher: Debug + Send + Sync {
    /// Returns the number of accounts on the network.
    async fn num_of_accounts(&self) -> Result<u64, MetaFetchError>;

    /// Returns the disk size used per 100M transactions.
    async fn disk_size_per_100m_txs(&self) -> Result<u64, MetaFetchError>;

    /// Returns the pruned disk size used per 100M transactions.
    async fn disk_size_pruned_per_100m_txs(&self) -> Result<u64, MetaFetchError>;

    /// Returns the current time to finality, in seconds.
    async fn time_to_finality(&self) -> Result<f64, MetaFetchError>;

    /// Returns the current time to block, in seconds.
    async fn time_to_block(&self) -> Result<f64, MetaFetchError>;
}

/// A [`MetaFetcher`] reading plain-text numbers over HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpMetaFetcher {
    config: MetaFetcherConfig,
    client: Client,
}

impl HttpMetaFetcher {
    /// Creates a new [`HttpMetaFetcher`] whose requests are bounded by `timeout`.
    pub fn new(config: MetaFetcherConfig, timeout: Duration) -> Result<Self, MetaFetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { config, client })
    }

    /// Returns the configured endpoints.
    pub const fn config(&self) -> &MetaFetcherConfig {
        &self.config
    }

    async fn fetch<T: FromStr>(
        &self,
        metric: &'static str,
        url: Option<&Url>,
    ) -> Result<T, MetaFetchError> {
        let url = url.ok_or(MetaFetchError::NotConfigured(metric))?;
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetaFetchError::Status { metric, status: status.as_u16() });
        }

        let body = response.text().await?;
        let body = body.trim();
        trace!(target: "meta_fetcher", metric, body, "Fetched metric");
        body.parse().map_err(|_| MetaFetchError::Parse { metric, body: body.to_string() })
    }

    /// Fetches a decimal metric. `NaN` and infinities are rejected.
    async fn fetch_decimal(
        &self,
        metric: &'static str,
        url: Option<&Url>,
    ) -> Result<f64, MetaFetchError> {
        let value: f64 = self.fetch(metric, url).await?;
        if !value.is_finite() {
            return Err(MetaFetchError::Parse { metric, body: value.to_string() });
        }
        Ok(value)
    }
}

#[async_trait]
impl MetaFetcher for HttpMetaFetcher {
    async fn num_of_accounts(&self) -> Result<u64, MetaFetchError> {
        self.fetch("number of accounts", self.config.number_of_accounts_url.as_ref()).await
    }

    async fn disk_size_per_100m_txs(&self) -> Result<u64, MetaFetchError> {
        self.fetch("disk size per 100M txs", self.config.disk_size_per_100m_txs_url.as_ref())
            .await
    }

    async fn disk_size_pruned_per_100m_txs(&self) -> Result<u64, MetaFetchError> {
        self.fetch(
            "pruned disk size per 100M txs",
            self.config.disk_size_pruned_per_100m_txs_url.as_ref(),
        )
        .await
    }

    async fn time_to_finality(&self) -> Result<f64, MetaFetchError> {
        self.fetch_decimal("time to finality", self.config.time_to_finality_url.as_ref()).await
    }

    async fn time_to_block(&self) -> Result<f64, MetaFetchError> {
        self.fetch_decimal("time to block", self.config.time_to_block_url.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Server, ServerGuard};
    use rstest::rstest;

    fn fetcher(server: &ServerGuard) -> HttpMetaFetcher {
        let url = |path: &str| Some(format!("{}/{path}", server.url()).parse().unwrap());
        let config = MetaFetcherConfig {
            number_of_accounts_url: url("accounts"),
            disk_size_per_100m_txs_url: url("disk"),
            disk_size_pruned_per_100m_txs_url: url("pruned"),
            time_to_finality_url: url("ttf"),
            time_to_block_url: None,
        };
        HttpMetaFetcher::new(config, Duration::from_secs(5)).unwrap()
    }

    #[rstest]
    #[case("123456", 123_456)]
    #[case("  42\n", 42)]
    #[case("\t0\r\n", 0)]
    #[tokio::test]
    async fn test_parses_trimmed_integers(#[case] body: &str, #[case] expected: u64) {
        let mut server = Server::new_async().await;
        let mock = server.mock("GET", "/accounts").with_body(body).create_async().await;

        assert_eq!(fetcher(&server).num_of_accounts().await.unwrap(), expected);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_parses_floats() {
        let mut server = Server::new_async().await;
        let _mock = server.mock("GET", "/ttf").with_body("1.25\n").create_async().await;

        assert_eq!(fetcher(&server).time_to_finality().await.unwrap(), 1.25);
    }

    #[rstest]
    #[case("NaN")]
    #[case("inf")]
    #[case("-infinity")]
    #[tokio::test]
    async fn test_rejects_non_finite_decimals(#[case] body: &str) {
        let mut server = Server::new_async().await;
        let _mock = server.mock("GET", "/ttf").with_body(body).create_async().await;

        let err = fetcher(&server).time_to_finality().await.unwrap_err();
        assert!(matches!(err, MetaFetchError::Parse { metric: "time to finality", .. }));
    }

    #[tokio::test]
    async fn test_rejects_non_success_status() {
        let mut server = Server::new_async().await;
        let _mock =
            server.mock("GET", "/disk").with_status(503).with_body("7").create_async().await;

        let err = fetcher(&server).disk_size_per_100m_txs().await.unwrap_err();
        assert!(matches!(err, MetaFetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_rejects_garbage() {
        let mut server = Server::new_async().await;
        let _mock =
            server.mock("GET", "/pruned").with_body("about 12 GB").create_async().await;

        let err = fetcher(&server).disk_size_pruned_per_100m_txs().await.unwrap_err();
        assert!(matches!(err, MetaFetchError::Parse { ref body, .. } if body == "about 12 GB"));
    }

    #[tokio::test]
    async fn test_unconfigured_metric() {
        let server = Server::new_async().await;
        let err = fetcher(&server).time_to_block().await.unwrap_err();
        assert!(err.is_not_configured());
    }
}
