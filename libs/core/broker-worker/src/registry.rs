//! Process-wide registry of live worker instances and exit coordination.
//!
//! The registry is explicitly constructed and injected; there is no
//! ambient global list. Instance creation, shutdown coordination, and test
//! resets can race in a multi-worker process, so every mutation goes
//! through the internal lock.

use crate::worker::WorkerInstance;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Registry of running worker instances.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: Mutex<Vec<Arc<WorkerInstance>>>,
}

impl WorkerRegistry {
    /// Create an empty registry. Construct one per process and share it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a newly created instance. Called at instance creation, before
    /// the instance connects its transport.
    pub async fn register(&self, worker: Arc<WorkerInstance>) {
        debug!(worker = %worker.id(), worker_type = %worker.worker_type(), "Registered worker");
        self.workers.lock().await.push(worker);
    }

    /// Number of registered instances.
    pub async fn len(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// Whether no instances are registered.
    pub async fn is_empty(&self) -> bool {
        self.workers.lock().await.is_empty()
    }

    /// Status snapshot of every registered instance, in insertion order.
    pub async fn snapshot(&self) -> Vec<WorkerStatus> {
        self.workers
            .lock()
            .await
            .iter()
            .map(|worker| WorkerStatus {
                id: worker.id().to_string(),
                worker_type: worker.worker_type().to_string(),
                state: worker.state().as_str(),
            })
            .collect()
    }

    /// Ask every registered instance to close its transport.
    ///
    /// Returns `false` for an empty registry. Every instance is attempted
    /// even after one fails; the result is `true` only when all of them
    /// shut down without error. Safe to call repeatedly: instances whose
    /// clients are already closed are no-ops.
    pub async fn exit_cleanly(&self) -> bool {
        let workers = self.workers.lock().await.clone();
        if workers.is_empty() {
            warn!("No workers registered, nothing to shut down");
            return false;
        }

        let mut all_ok = true;
        for worker in workers {
            if let Err(error) = worker.exit_cleanly().await {
                warn!(
                    worker = %worker.id(),
                    error = %error,
                    "Worker failed to exit cleanly"
                );
                all_ok = false;
            }
        }
        all_ok
    }

    /// Drop every registration. For controlled restarts and test isolation.
    pub async fn reset(&self) {
        self.workers.lock().await.clear();
    }
}

/// Introspection row for one registered instance.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    /// Unique instance id.
    pub id: String,
    /// Worker type the instance was started from.
    pub worker_type: String,
    /// Dispatch engine state label.
    pub state: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BrokerClient, MockBrokerClient};
    use crate::error::ClientError;

    fn instance_with_client(client: MockBrokerClient) -> Arc<WorkerInstance> {
        let instance = Arc::new(WorkerInstance::new("test", Vec::new()));
        let client: Arc<dyn BrokerClient> = Arc::new(client);
        instance.attach_client(client);
        instance
    }

    fn closable_client() -> MockBrokerClient {
        let mut client = MockBrokerClient::new();
        client.expect_is_closed().return_const(false);
        client.expect_close().times(1).returning(|| Ok(()));
        client
    }

    fn failing_client() -> MockBrokerClient {
        let mut client = MockBrokerClient::new();
        client.expect_is_closed().return_const(false);
        client
            .expect_close()
            .times(1)
            .returning(|| Err(ClientError::close("boom")));
        client
    }

    #[tokio::test]
    async fn test_exit_cleanly_with_no_workers_returns_false() {
        let registry = WorkerRegistry::new();
        assert!(!registry.exit_cleanly().await);
    }

    #[tokio::test]
    async fn test_exit_cleanly_with_one_worker_returns_true() {
        let registry = WorkerRegistry::new();
        registry.register(instance_with_client(closable_client())).await;

        assert!(registry.exit_cleanly().await);
    }

    #[tokio::test]
    async fn test_exit_cleanly_reports_failure() {
        let registry = WorkerRegistry::new();
        registry.register(instance_with_client(failing_client())).await;

        assert!(!registry.exit_cleanly().await);
    }

    #[tokio::test]
    async fn test_exit_cleanly_attempts_every_worker() {
        let registry = WorkerRegistry::new();
        // The mocks verify on drop that close() was invoked on BOTH
        // instances even though the first one fails.
        registry.register(instance_with_client(failing_client())).await;
        registry.register(instance_with_client(closable_client())).await;

        assert!(!registry.exit_cleanly().await);
    }

    #[tokio::test]
    async fn test_reset_clears_the_registry() {
        let registry = WorkerRegistry::new();
        registry
            .register(Arc::new(WorkerInstance::new("test", Vec::new())))
            .await;
        assert_eq!(registry.len().await, 1);

        registry.reset().await;
        assert!(registry.is_empty().await);
        assert!(!registry.exit_cleanly().await);
    }

    #[tokio::test]
    async fn test_snapshot_reports_states_in_insertion_order() {
        let registry = WorkerRegistry::new();
        registry
            .register(Arc::new(WorkerInstance::new("alpha", Vec::new())))
            .await;
        registry
            .register(Arc::new(WorkerInstance::new("beta", Vec::new())))
            .await;

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].worker_type, "alpha");
        assert_eq!(snapshot[1].worker_type, "beta");
        assert_eq!(snapshot[0].state, "disconnected");
    }
}
