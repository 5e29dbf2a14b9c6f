//! Utilities for spinning up a prometheus metrics server.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::{IpAddr, SocketAddr};

/// Installs the global Prometheus recorder and serves it on `addr:port`.
pub fn init_prometheus_server(addr: IpAddr, port: u16) -> Result<(), BuildError> {
    let addr = SocketAddr::from((addr, port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    tracing::info!(target: "prometheus", %addr, "Serving metrics");
    Ok(())
}
