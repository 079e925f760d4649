//! Prometheus exporter
//!
//! The recorder is always served on the API's `/metrics` route; a dedicated
//! scrape listener is started only when an address is configured.

use crate::metrics::recorder::init_metrics;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// RPC round trips are sub-second unless a remote is slow.
const RPC_BUCKETS: [f64; 10] = [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0, 5.0, 30.0];

/// Jobs range from a small file to a multi-hour download.
const JOB_BUCKETS: [f64; 9] = [0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0, 1800.0, 7200.0];

#[derive(Debug, Clone, Default)]
pub struct MetricsConfig {
    /// Separate scrape listener; `None` serves metrics only through the API.
    pub listen_addr: Option<SocketAddr>,
}

impl MetricsConfig {
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: Some(addr),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Invalid exporter settings: {0}")]
    Build(#[from] BuildError),

    #[error("A different metrics recorder is already installed")]
    RecorderInUse,
}

/// Install the Prometheus recorder and, if configured, its scrape listener.
///
/// Must run inside a tokio runtime. Later calls return the first handle.
pub fn install_exporter(config: &MetricsConfig) -> Result<&'static PrometheusHandle, MetricsError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("paneport_rpc_request_duration_seconds".to_string()),
            &RPC_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full("paneport_job_duration_seconds".to_string()),
            &JOB_BUCKETS,
        )?;
    let handle = match config.listen_addr {
        Some(addr) => {
            let (recorder, exporter) = builder.with_http_listener(addr).build()?;
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder).map_err(|_| MetricsError::RecorderInUse)?;
            tokio::spawn(async move {
                if let Err(e) = exporter.await {
                    tracing::error!("Metrics listener on {} stopped: {:?}", addr, e);
                }
            });
            handle
        }
        // Without a listener nothing needs to be spawned.
        None => builder.install_recorder()?,
    };

    init_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle))
}

/// Current exposition text, if the exporter is installed.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// `GET /metrics` on the main API server.
pub fn metrics_route<S>() -> axum::routing::MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    axum::routing::get(|| async {
        match render_metrics() {
            Some(body) => (
                [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
                .into_response(),
            None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics exporter not installed")
                .into_response(),
        }
    })
}
