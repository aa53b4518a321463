//! Shared test utilities for worker testing
//!
//! This crate provides reusable test infrastructure:
//! - `ScriptedBroker`: an in-memory `BrokerClient` with scripted message
//!   deliveries and recorded redelivery/close calls
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use broker_worker::Message;
//! use test_utils::ScriptedBroker;
//!
//! #[tokio::test]
//! async fn my_worker_test() {
//!     let broker = Arc::new(ScriptedBroker::new());
//!     broker.script("/queue/orders", Message::new("/queue/orders", "payload"));
//!
//!     // Register the broker in a TransportFactory, run the worker, then
//!     // assert on broker.unreceived() / broker.close_calls().
//! }
//! ```

mod broker;

pub use broker::ScriptedBroker;
