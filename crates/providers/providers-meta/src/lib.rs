#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod errors;
pub use errors::MetaFetchError;

mod config;
pub use config::MetaFetcherConfig;

mod fetcher;
#[cfg(any(test, feature = "test-utils"))]
pub use fetcher::MockMetaFetcher;
pub use fetcher::{HttpMetaFetcher, MetaFetcher};
