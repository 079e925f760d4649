//! Metrics recorder for transfer jobs and the RPC surface
//!
//! Records through the `metrics` facade; nothing is kept unless an exporter
//! is installed.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    // Job counters
    describe_counter!("paneport_jobs_added_total", "Total number of transfer jobs queued");
    describe_counter!(
        "paneport_jobs_started_total",
        "Total number of transfer jobs started"
    );
    describe_counter!(
        "paneport_jobs_completed_total",
        "Total number of transfer jobs completed successfully"
    );
    describe_counter!(
        "paneport_jobs_failed_total",
        "Total number of transfer jobs that ended in error"
    );
    describe_counter!(
        "paneport_jobs_cancelled_total",
        "Total number of transfer jobs cancelled or skipped"
    );
    describe_counter!("paneport_bytes_transferred_total", "Total bytes moved by jobs");

    // Gauges
    describe_gauge!("paneport_active_jobs", "Number of currently active jobs");
    describe_gauge!("paneport_queued_jobs", "Number of pending jobs");

    // Histograms
    describe_histogram!("paneport_job_duration_seconds", "Wall time of completed jobs");
    describe_histogram!(
        "paneport_job_throughput_bytes_per_second",
        "Average throughput of completed jobs"
    );

    // RPC
    describe_counter!("paneport_rpc_requests_total", "RPC requests handled");
    describe_histogram!(
        "paneport_rpc_request_duration_seconds",
        "Time to handle one RPC request"
    );
}

// ============== Jobs ==============

pub fn record_job_added(transfer_type: &str) {
    counter!("paneport_jobs_added_total", "type" => transfer_type.to_string()).increment(1);
}

pub fn record_job_started(transfer_type: &str) {
    counter!("paneport_jobs_started_total", "type" => transfer_type.to_string()).increment(1);
}

pub fn record_job_completed(transfer_type: &str, duration: Duration, bytes: u64) {
    counter!("paneport_jobs_completed_total", "type" => transfer_type.to_string()).increment(1);
    histogram!("paneport_job_duration_seconds").record(duration.as_secs_f64());

    let throughput = if duration.as_secs_f64() > 0.0 {
        bytes as f64 / duration.as_secs_f64()
    } else {
        0.0
    };
    histogram!("paneport_job_throughput_bytes_per_second").record(throughput);
}

pub fn record_job_failed(transfer_type: &str) {
    counter!("paneport_jobs_failed_total", "type" => transfer_type.to_string()).increment(1);
}

pub fn record_job_cancelled(transfer_type: &str) {
    counter!("paneport_jobs_cancelled_total", "type" => transfer_type.to_string()).increment(1);
}

pub fn record_bytes_transferred(transfer_type: &str, bytes: u64) {
    counter!("paneport_bytes_transferred_total", "type" => transfer_type.to_string())
        .increment(bytes);
}

pub fn set_job_gauges(active: usize, queued: usize) {
    gauge!("paneport_active_jobs").set(active as f64);
    gauge!("paneport_queued_jobs").set(queued as f64);
}

// ============== RPC ==============

pub fn record_rpc_request(method: &str, ok: bool, duration: Duration) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("paneport_rpc_requests_total", "method" => method.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("paneport_rpc_request_duration_seconds", "method" => method.to_string())
        .record(duration.as_secs_f64());
}

/// Times one run of a job and records how it ended
pub struct JobTimer {
    transfer_type: &'static str,
    start_time: Instant,
}

impl JobTimer {
    pub fn start(transfer_type: &'static str) -> Self {
        record_job_started(transfer_type);
        Self {
            transfer_type,
            start_time: Instant::now(),
        }
    }

    pub fn complete(self, bytes: u64) {
        record_job_completed(self.transfer_type, self.start_time.elapsed(), bytes);
    }

    pub fn fail(self) {
        record_job_failed(self.transfer_type);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Should not panic when called multiple times
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_recording_without_exporter() {
        record_job_added("upload");
        record_bytes_transferred("upload", 1024);
        set_job_gauges(1, 2);
        record_rpc_request("fs.list", true, Duration::from_millis(3));
    }

    #[test]
    fn test_job_timer() {
        let timer = JobTimer::start("download");
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed() >= Duration::from_millis(5));
        timer.complete(4096);
    }
}
