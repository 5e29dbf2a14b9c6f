#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod backtrace;

mod error;
pub use error::{CliError, CliResult};

mod log;
pub use log::{LogArgs, init_tracing_subscriber};

mod metrics;
pub use metrics::{DEFAULT_METRICS_PORT, MetricsArgs};

mod prometheus;
pub use prometheus::init_prometheus_server;

mod styles;
pub use styles::cli_styles;
