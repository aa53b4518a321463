//! Prometheus metrics for worker supervision.
//!
//! Provides observability into dispatch outcomes and worker lifecycles.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize Prometheus metrics
///
/// Call this once at startup. Subsequent calls are no-ops.
pub fn init_metrics() {
    let _ = PROMETHEUS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");
        info!("Prometheus metrics initialized");
        handle
    });
}

/// Get the Prometheus handle for rendering metrics
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in Prometheus format
pub fn render_metrics() -> String {
    prometheus_handle()
        .map(|h| h.render())
        .unwrap_or_default()
}

/// Per-worker-type metrics helper
#[derive(Clone)]
pub struct WorkerMetrics {
    /// Worker type name for labeling
    worker_type: String,
}

impl WorkerMetrics {
    /// Create new WorkerMetrics
    pub fn new(worker_type: impl Into<String>) -> Self {
        Self {
            worker_type: worker_type.into(),
        }
    }

    /// Record an instance entering its runloop
    pub fn worker_started(&self) {
        counter!(
            "broker_worker_instances_started_total",
            "worker_type" => self.worker_type.clone()
        )
        .increment(1);

        gauge!(
            "broker_worker_instances_running",
            "worker_type" => self.worker_type.clone()
        )
        .increment(1.0);
    }

    /// Record an instance leaving its runloop
    pub fn worker_stopped(&self) {
        gauge!(
            "broker_worker_instances_running",
            "worker_type" => self.worker_type.clone()
        )
        .decrement(1.0);
    }

    /// Record a message being delivered to a handler
    pub fn message_received(&self, queue: &str) {
        counter!(
            "broker_worker_messages_received_total",
            "worker_type" => self.worker_type.clone(),
            "queue" => queue.to_string()
        )
        .increment(1);
    }

    /// Record a handler reporting success
    pub fn message_handled(&self, queue: &str) {
        counter!(
            "broker_worker_messages_processed_total",
            "worker_type" => self.worker_type.clone(),
            "queue" => queue.to_string(),
            "status" => "success"
        )
        .increment(1);
    }

    /// Record a handler reporting failure
    pub fn handler_failed(&self, queue: &str) {
        counter!(
            "broker_worker_messages_processed_total",
            "worker_type" => self.worker_type.clone(),
            "queue" => queue.to_string(),
            "status" => "failed"
        )
        .increment(1);
    }

    /// Record a redelivery request being sent to the broker
    pub fn unreceive_requested(&self, queue: &str) {
        counter!(
            "broker_worker_unreceive_requests_total",
            "worker_type" => self.worker_type.clone(),
            "queue" => queue.to_string()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = WorkerMetrics::new("orders");
        assert_eq!(metrics.worker_type, "orders");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        // Without an installed recorder these must not panic.
        let metrics = WorkerMetrics::new("orders");
        metrics.worker_started();
        metrics.message_received("/queue/orders");
        metrics.message_handled("/queue/orders");
        metrics.handler_failed("/queue/orders");
        metrics.unreceive_requested("/queue/orders");
        metrics.worker_stopped();
    }
}
