//! Metrics arguments.

use crate::{CliResult, init_prometheus_server};
use clap::Args;
use std::net::{IpAddr, Ipv4Addr};

/// The default port of the Prometheus endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Prometheus arguments.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Serve Prometheus metrics.
    #[arg(long = "metrics.enabled", default_value_t = false, env = "OPERA_METRICS_ENABLED")]
    pub enabled: bool,
    /// Address of the Prometheus endpoint.
    #[arg(
        long = "metrics.addr",
        default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        env = "OPERA_METRICS_ADDR"
    )]
    pub addr: IpAddr,
    /// Port of the Prometheus endpoint.
    #[arg(
        long = "metrics.port",
        default_value_t = DEFAULT_METRICS_PORT,
        env = "OPERA_METRICS_PORT"
    )]
    pub port: u16,
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self { enabled: false, addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: DEFAULT_METRICS_PORT }
    }
}

impl MetricsArgs {
    /// Starts the Prometheus endpoint if enabled. Returns whether it was started.
    pub fn init_metrics(&self) -> CliResult<bool> {
        if !self.enabled {
            return Ok(false);
        }
        init_prometheus_server(self.addr, self.port)?;
        Ok(true)
    }
}
