//! Metrics collection and reporting

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ErrorKind;

/// Metric name prefix
const PREFIX: &str = "transcript_embedder";

/// Snapshot of the counters
#[derive(Debug, Clone, PartialEq)]
pub struct SystemMetrics {
    /// Total `/embed` requests handled
    pub total_requests: u64,

    /// Rejected with 400
    pub invalid_requests: u64,

    /// Rejected with 401
    pub unauthorized_requests: u64,

    /// Failed with 500
    pub internal_errors: u64,

    /// Chunks embedded successfully
    pub chunks_embedded: u64,

    /// Reclaim passes run
    pub reclaim_runs: u64,

    /// Reclaim steps that failed or panicked
    pub reclaim_step_failures: u64,

    /// Average response time (ms)
    pub avg_response_time_ms: f64,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

/// Latency histogram buckets (in milliseconds)
const LATENCY_BUCKETS: &[f64] = &[5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0];

/// Histogram for tracking latency distribution
#[derive(Debug, Clone)]
pub struct Histogram {
    buckets: Vec<(f64, Arc<AtomicU64>)>,
    /// Bit pattern of an `f64` running total
    sum: Arc<AtomicU64>,
    count: Arc<AtomicU64>,
}

impl Histogram {
    fn new(buckets: &[f64]) -> Self {
        let bucket_counters = buckets
            .iter()
            .map(|&b| (b, Arc::new(AtomicU64::new(0))))
            .collect();

        Self {
            buckets: bucket_counters,
            sum: Arc::new(AtomicU64::new(0f64.to_bits())),
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    fn observe(&self, value: f64) {
        let _ = self.sum.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some((f64::from_bits(bits) + value).to_bits())
        });
        self.count.fetch_add(1, Ordering::Relaxed);

        // Cumulative: every bucket >= value is incremented
        for (bucket, counter) in &self.buckets {
            if value <= *bucket {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn export_prometheus(&self, name: &str, help: &str) -> String {
        let mut output = String::new();

        output.push_str(&format!("# HELP {} {}\n", name, help));
        output.push_str(&format!("# TYPE {} histogram\n", name));

        for (bucket, counter) in &self.buckets {
            let count = counter.load(Ordering::Relaxed);
            output.push_str(&format!("{}_bucket{{le=\"{}\"}} {}\n", name, bucket, count));
        }

        let total_count = self.count.load(Ordering::Relaxed);
        output.push_str(&format!("{}_bucket{{le=\"+Inf\"}} {}\n", name, total_count));

        let sum = f64::from_bits(self.sum.load(Ordering::Relaxed));
        output.push_str(&format!("{}_sum {:.3}\n", name, sum));
        output.push_str(&format!("{}_count {}\n", name, total_count));

        output
    }
}

/// Metrics collector
pub struct MetricsCollector {
    start_time: Instant,
    total_requests: AtomicU64,
    invalid_requests: AtomicU64,
    unauthorized_requests: AtomicU64,
    internal_errors: AtomicU64,
    chunks_embedded: AtomicU64,
    total_response_time_ms: AtomicU64,
    reclaim_runs: AtomicU64,
    reclaim_step_failures: AtomicU64,

    request_latency: Histogram,
    embedding_latency: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            invalid_requests: AtomicU64::new(0),
            unauthorized_requests: AtomicU64::new(0),
            internal_errors: AtomicU64::new(0),
            chunks_embedded: AtomicU64::new(0),
            total_response_time_ms: AtomicU64::new(0),
            reclaim_runs: AtomicU64::new(0),
            reclaim_step_failures: AtomicU64::new(0),
            request_latency: Histogram::new(LATENCY_BUCKETS),
            embedding_latency: Histogram::new(LATENCY_BUCKETS),
        }
    }

    /// Record a finished `/embed` request
    pub fn record_request(&self, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_ms
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);
        self.request_latency.observe(response_time.as_secs_f64() * 1000.0);
    }

    /// Record a failed request by kind
    pub fn record_error(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::InvalidRequest => &self.invalid_requests,
            ErrorKind::Unauthorized => &self.unauthorized_requests,
            ErrorKind::Internal => &self.internal_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful delegate invocation
    pub fn record_embedding(&self, chunks: usize, duration: Duration) {
        self.chunks_embedded.fetch_add(chunks as u64, Ordering::Relaxed);
        self.embedding_latency.observe(duration.as_secs_f64() * 1000.0);
    }

    /// Record a reclaim pass
    pub fn record_reclaim(&self, failed_steps: usize) {
        self.reclaim_runs.fetch_add(1, Ordering::Relaxed);
        self.reclaim_step_failures.fetch_add(failed_steps as u64, Ordering::Relaxed);
    }

    /// Get current metrics
    pub fn get_metrics(&self) -> SystemMetrics {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.total_response_time_ms.load(Ordering::Relaxed);

        let avg_response_time_ms = if total_requests > 0 {
            total_response_time as f64 / total_requests as f64
        } else {
            0.0
        };

        SystemMetrics {
            total_requests,
            invalid_requests: self.invalid_requests.load(Ordering::Relaxed),
            unauthorized_requests: self.unauthorized_requests.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            chunks_embedded: self.chunks_embedded.load(Ordering::Relaxed),
            reclaim_runs: self.reclaim_runs.load(Ordering::Relaxed),
            reclaim_step_failures: self.reclaim_step_failures.load(Ordering::Relaxed),
            avg_response_time_ms,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Export metrics in Prometheus format
    pub fn export_prometheus(&self) -> String {
        let m = self.get_metrics();

        let mut output = format!(
            "# HELP {p}_embed_requests_total Total number of embed requests\n\
             # TYPE {p}_embed_requests_total counter\n\
             {p}_embed_requests_total {}\n\
             \n\
             # HELP {p}_embed_errors_total Embed requests that failed, by kind\n\
             # TYPE {p}_embed_errors_total counter\n\
             {p}_embed_errors_total{{kind=\"invalid_request\"}} {}\n\
             {p}_embed_errors_total{{kind=\"unauthorized\"}} {}\n\
             {p}_embed_errors_total{{kind=\"internal\"}} {}\n\
             \n\
             # HELP {p}_chunks_embedded_total Chunks embedded successfully\n\
             # TYPE {p}_chunks_embedded_total counter\n\
             {p}_chunks_embedded_total {}\n\
             \n\
             # HELP {p}_reclaim_runs_total Reclaim passes run\n\
             # TYPE {p}_reclaim_runs_total counter\n\
             {p}_reclaim_runs_total {}\n\
             \n\
             # HELP {p}_reclaim_step_failures_total Reclaim steps that failed\n\
             # TYPE {p}_reclaim_step_failures_total counter\n\
             {p}_reclaim_step_failures_total {}\n\
             \n\
             # HELP {p}_avg_response_time_ms Average response time in milliseconds\n\
             # TYPE {p}_avg_response_time_ms gauge\n\
             {p}_avg_response_time_ms {:.2}\n\
             \n\
             # HELP {p}_uptime_seconds Uptime in seconds\n\
             # TYPE {p}_uptime_seconds gauge\n\
             {p}_uptime_seconds {}\n\
             \n",
            m.total_requests,
            m.invalid_requests,
            m.unauthorized_requests,
            m.internal_errors,
            m.chunks_embedded,
            m.reclaim_runs,
            m.reclaim_step_failures,
            m.avg_response_time_ms,
            m.uptime_secs,
            p = PREFIX,
        );

        output.push_str(&self.request_latency.export_prometheus(
            &format!("{}_request_duration_ms", PREFIX),
            "Embed request duration in milliseconds"
        ));
        output.push('\n');

        output.push_str(&self.embedding_latency.export_prometheus(
            &format!("{}_embedding_duration_ms", PREFIX),
            "Delegate invocation duration in milliseconds"
        ));

        output
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
