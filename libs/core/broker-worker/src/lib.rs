//! Broker Worker Framework
//!
//! A broker-agnostic supervision layer for message-queue consumer workers.
//!
//! ## Features
//!
//! - **Declarative worker types**: per type, a transport mode (STOMP or
//!   JMS), a lazily-evaluated configuration supplier, and an ordered set of
//!   queue subscriptions with boolean-returning handlers
//! - **Dead-letter redelivery**: a handler returning `false` triggers a
//!   single `unreceive` request when the subscription carries
//!   `dead_letter_queue` / `max_redeliveries` options and the transport
//!   supports it
//! - **Worker registry**: process-wide set of live instances with
//!   idempotent, coordinated shutdown
//! - **Pluggable transports**: concrete broker clients implement the
//!   `BrokerClient` trait and are registered per mode in a
//!   `TransportFactory`
//! - **Prometheus metrics**: built-in observability
//! - **Health endpoints**: K8s-ready liveness and readiness probes
//!
//! ## Example
//!
//! ```ignore
//! use broker_worker::{
//!     Consumer, TransportFactory, TransportMode, WorkerDefinition, WorkerRegistry,
//! };
//! use std::sync::Arc;
//!
//! let registry = Arc::new(WorkerRegistry::new());
//! let mut transports = TransportFactory::new();
//! transports.register(TransportMode::Stomp, || my_stomp_client());
//!
//! let mut orders = WorkerDefinition::new("orders");
//! orders
//!     .configure(|| load_broker_config())
//!     .consume(
//!         Consumer::queue("/queue/orders")
//!             .option("dead_letter_queue", "/queue/orders_dlq")
//!             .option("max_redeliveries", 3)
//!             .handler(|message| handle_order(message)),
//!     )?;
//!
//! let handle = orders.spawn(registry.clone(), Arc::new(transports));
//! broker_worker::spawn_exit_handler(registry);
//! handle.await??;
//! ```

mod client;
mod config;
mod consumer;
mod dispatch;
mod error;
mod health;
pub mod metrics;
mod message;
mod registry;
mod shutdown;
mod transport;
mod worker;

// Re-export main types
pub use client::{BrokerClient, OnMessage};
pub use config::{ConfigSupplier, Configuration, ConfigurationSlot};
pub use consumer::{
    Consumer, ConsumerEntry, DEAD_LETTER_QUEUE, Handler, Headers, MAX_REDELIVERIES,
};
pub use error::{ClientError, WorkerError};
pub use health::{HealthResponse, HealthState, health_router};
pub use message::Message;
pub use metrics::{WorkerMetrics, init_metrics};
pub use registry::{WorkerRegistry, WorkerStatus};
pub use shutdown::{shutdown_signal, spawn_exit_handler};
pub use transport::{ClientBuilder, TransportFactory, TransportMode};
pub use worker::{DispatchState, LogSink, WorkerDefinition, WorkerInstance};
