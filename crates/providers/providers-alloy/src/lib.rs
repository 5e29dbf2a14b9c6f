#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod errors;
pub use errors::UpstreamError;

mod wire;

mod client;
#[cfg(any(test, feature = "test-utils"))]
pub use client::MockUpstreamClient;
pub use client::{AlloyUpstream, DEFAULT_RPC_TIMEOUT, UpstreamClient};

mod head_feed;
#[cfg(any(test, feature = "test-utils"))]
pub use head_feed::MockHeadSource;
pub use head_feed::{
    HEAD_CHANNEL_CAPACITY, HeadFeed, HeadFeedConfig, HeadReceiver, HeadSource, HeadSubscription,
    POLL_INTERVAL, SUBSCRIBE_RETRY_INTERVAL,
};
