//! Metrics and observability module
//!
//! Key metrics exposed:
//! - Jobs added, started, completed, failed and cancelled
//! - Bytes moved and per-job throughput
//! - Active and queued job gauges
//! - RPC request counts and latency

pub mod exporter;
pub mod recorder;

pub use exporter::{install_exporter, metrics_route, render_metrics, MetricsConfig, MetricsError};
pub use recorder::{
    init_metrics, record_bytes_transferred, record_job_added, record_job_cancelled,
    record_rpc_request, set_job_gauges, JobTimer,
};
