//! Worker type declaration and running worker instances.
//!
//! A `WorkerDefinition` is the declared shape of one kind of consumer:
//! transport mode, configuration supplier, ordered queue subscriptions,
//! optional log sink. Starting it produces a `WorkerInstance`, a running
//! embodiment owning its broker client exclusively, which is registered
//! with the `WorkerRegistry` before it connects and then driven through
//! the dispatch engine until shutdown.

use crate::client::BrokerClient;
use crate::config::{ConfigSupplier, ConfigurationSlot};
use crate::consumer::{Consumer, ConsumerEntry};
use crate::dispatch;
use crate::error::{ClientError, WorkerError};
use crate::metrics::WorkerMetrics;
use crate::registry::WorkerRegistry;
use crate::transport::{TransportFactory, TransportMode};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Bound on how long a shutdown waits for one transport to close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Lazily-evaluated supplier of a `tracing` dispatcher for one worker type.
///
/// When registered, handler invocations run inside this dispatcher's scope,
/// so a worker type can route its handler logs to its own subscriber. The
/// supplier is re-run per dispatch, like the configuration supplier.
pub type LogSink = Arc<dyn Fn() -> tracing::Dispatch + Send + Sync>;

/// Lifecycle of a worker instance's dispatch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Created, transport not yet established.
    Disconnected,
    /// Transport session established.
    Connected,
    /// All registered queues subscribed.
    Subscribed,
    /// Runloop active, consuming messages.
    Running,
    /// Transport closed; the instance is done.
    Closed,
}

impl DispatchState {
    /// Stable label for logs and the health surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchState::Disconnected => "disconnected",
            DispatchState::Connected => "connected",
            DispatchState::Subscribed => "subscribed",
            DispatchState::Running => "running",
            DispatchState::Closed => "closed",
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A declared worker type.
///
/// # Example
///
/// ```rust,ignore
/// use broker_worker::{Consumer, WorkerDefinition, WorkerRegistry, TransportFactory};
///
/// let mut orders = WorkerDefinition::new("orders");
/// orders
///     .use_stomp()
///     .configure(|| load_broker_config())
///     .consume(
///         Consumer::queue("/queue/orders")
///             .option("dead_letter_queue", "/queue/orders_dlq")
///             .option("max_redeliveries", 3)
///             .handler(|message| handle_order(message)),
///     )?;
///
/// let handle = orders.spawn(registry.clone(), transports.clone());
/// ```
#[derive(Clone)]
pub struct WorkerDefinition {
    name: String,
    transport: TransportMode,
    configuration: ConfigurationSlot,
    consumers: Vec<Arc<ConsumerEntry>>,
    log_sink: Option<LogSink>,
}

impl WorkerDefinition {
    /// Declare a new worker type. Defaults to the STOMP transport.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: TransportMode::default(),
            configuration: ConfigurationSlot::new(),
            consumers: Vec::new(),
            log_sink: None,
        }
    }

    /// The declared worker type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Select the STOMP transport. Clears any other selection.
    pub fn use_stomp(&mut self) -> &mut Self {
        self.transport = TransportMode::Stomp;
        self
    }

    /// Select the JMS transport. Clears any other selection.
    pub fn use_jms(&mut self) -> &mut Self {
        self.transport = TransportMode::Jms;
        self
    }

    /// Whether the STOMP transport is active.
    pub fn is_stomp(&self) -> bool {
        self.transport.is_stomp()
    }

    /// Whether the JMS transport is active.
    pub fn is_jms(&self) -> bool {
        self.transport.is_jms()
    }

    /// The active transport mode.
    pub fn transport_mode(&self) -> TransportMode {
        self.transport
    }

    /// Register the configuration supplier, invoked on every access.
    pub fn configure<F>(&mut self, supplier: F) -> &mut Self
    where
        F: Fn() -> crate::config::Configuration + Send + Sync + 'static,
    {
        self.configuration.configure(supplier);
        self
    }

    /// The registered configuration supplier. Fails with a configuration
    /// error when none has been registered yet.
    pub fn configuration(&self) -> Result<ConfigSupplier, WorkerError> {
        self.configuration.supplier()
    }

    /// Register a queue subscription. Fails fast when the consumer was
    /// built without a handler. Registration order is subscription order,
    /// and re-registering a queue name adds an independent second entry.
    pub fn consume(&mut self, consumer: Consumer) -> Result<&mut Self, WorkerError> {
        let entry = consumer.build()?;
        debug!(worker_type = %self.name, queue = %entry.queue(), "Registered consumer");
        self.consumers.push(Arc::new(entry));
        Ok(self)
    }

    /// The registered consumers, in registration order.
    pub fn consumers(&self) -> &[Arc<ConsumerEntry>] {
        &self.consumers
    }

    /// Register a lazily-evaluated log sink for handler invocations.
    pub fn log<F>(&mut self, sink: F) -> &mut Self
    where
        F: Fn() -> tracing::Dispatch + Send + Sync + 'static,
    {
        self.log_sink = Some(Arc::new(sink));
        self
    }

    pub(crate) fn log_sink(&self) -> Option<LogSink> {
        self.log_sink.clone()
    }

    /// Drop every registered consumer. For controlled restarts and tests.
    pub fn clear_consumers(&mut self) -> &mut Self {
        self.consumers.clear();
        self
    }

    /// Restore the definition to its defaults, keeping only the name.
    pub fn reset(&mut self) -> &mut Self {
        let name = std::mem::take(&mut self.name);
        *self = WorkerDefinition::new(name);
        self
    }

    /// Start one instance: register it with the registry, connect a client
    /// for the active transport, subscribe every consumer, and drive the
    /// runloop until the client is closed.
    pub async fn run(
        &self,
        registry: &WorkerRegistry,
        transports: &TransportFactory,
    ) -> Result<(), WorkerError> {
        let instance = Arc::new(WorkerInstance::new(&self.name, self.consumers.clone()));
        registry.register(Arc::clone(&instance)).await;
        instance.run(self, transports).await
    }

    /// Spawn one instance onto the runtime. Call repeatedly to run several
    /// instances of the same worker type concurrently.
    pub fn spawn(
        &self,
        registry: Arc<WorkerRegistry>,
        transports: Arc<TransportFactory>,
    ) -> JoinHandle<Result<(), WorkerError>> {
        let definition = self.clone();
        tokio::spawn(async move { definition.run(&registry, &transports).await })
    }
}

/// One running, connected embodiment of a worker type.
pub struct WorkerInstance {
    id: String,
    worker_type: String,
    consumers: Vec<Arc<ConsumerEntry>>,
    client: Mutex<Option<Arc<dyn BrokerClient>>>,
    state: Mutex<DispatchState>,
}

impl WorkerInstance {
    pub(crate) fn new(worker_type: &str, consumers: Vec<Arc<ConsumerEntry>>) -> Self {
        Self {
            id: format!("worker-{}", Uuid::new_v4()),
            worker_type: worker_type.to_string(),
            consumers,
            client: Mutex::new(None),
            state: Mutex::new(DispatchState::Disconnected),
        }
    }

    /// Unique instance id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The worker type this instance was started from.
    pub fn worker_type(&self) -> &str {
        &self.worker_type
    }

    /// Current dispatch engine state.
    pub fn state(&self) -> DispatchState {
        *lock(&self.state)
    }

    /// Whether this instance has finished or been shut down.
    pub fn is_closed(&self) -> bool {
        self.state() == DispatchState::Closed
    }

    /// The consumers this instance subscribes, in registration order.
    pub fn consumers(&self) -> &[Arc<ConsumerEntry>] {
        &self.consumers
    }

    /// The attached broker client, once connected.
    pub fn client(&self) -> Option<Arc<dyn BrokerClient>> {
        lock(&self.client).clone()
    }

    pub(crate) fn attach_client(&self, client: Arc<dyn BrokerClient>) {
        *lock(&self.client) = Some(client);
    }

    fn set_state(&self, next: DispatchState) {
        *lock(&self.state) = next;
    }

    pub(crate) async fn run(
        &self,
        definition: &WorkerDefinition,
        transports: &TransportFactory,
    ) -> Result<(), WorkerError> {
        // Resolve configuration before touching the transport; a missing
        // supplier fails here, not mid-connection.
        let supplier = definition.configuration()?;
        let config = supplier();

        let client = transports.create(definition.transport_mode())?;
        client.connect(&config).await?;
        self.attach_client(Arc::clone(&client));
        self.set_state(DispatchState::Connected);
        info!(
            worker = %self.id,
            worker_type = %self.worker_type,
            transport = %definition.transport_mode(),
            "Worker connected"
        );

        let metrics = WorkerMetrics::new(&self.worker_type);
        for entry in &self.consumers {
            let on_message = dispatch::on_message(
                Arc::clone(&client),
                Arc::clone(entry),
                definition.log_sink(),
                metrics.clone(),
            );
            client
                .subscribe(entry.queue(), entry.options(), on_message)
                .await?;
            debug!(worker = %self.id, queue = %entry.queue(), "Subscribed");
        }
        self.set_state(DispatchState::Subscribed);

        metrics.worker_started();
        self.set_state(DispatchState::Running);
        info!(
            worker = %self.id,
            consumers = self.consumers.len(),
            "Worker running"
        );

        let result = client.runloop().await;

        self.set_state(DispatchState::Closed);
        metrics.worker_stopped();
        info!(worker = %self.id, "Worker stopped");
        result.map_err(WorkerError::from)
    }

    /// Close this instance's transport, if one was ever established.
    ///
    /// A worker that never connected, or whose client is already closed,
    /// is a no-op. Close errors are returned for the coordinator to
    /// aggregate; they never panic. An unresponsive transport is bounded
    /// by `CLOSE_TIMEOUT` so shutdown cannot block indefinitely.
    pub async fn exit_cleanly(&self) -> Result<(), WorkerError> {
        match self.client() {
            None => Ok(()),
            Some(client) if client.is_closed() => Ok(()),
            Some(client) => {
                info!(worker = %self.id, "Closing worker transport");
                match tokio::time::timeout(CLOSE_TIMEOUT, client.close()).await {
                    Ok(result) => {
                        result?;
                        self.set_state(DispatchState::Closed);
                        Ok(())
                    }
                    Err(_) => Err(WorkerError::Transport(ClientError::close(format!(
                        "close timed out after {}s",
                        CLOSE_TIMEOUT.as_secs()
                    )))),
                }
            }
        }
    }
}
