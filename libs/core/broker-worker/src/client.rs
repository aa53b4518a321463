//! Broker client boundary.
//!
//! One implementation of `BrokerClient` exists per transport mode (STOMP,
//! JMS). Implementations live outside this crate; the supervision layer
//! only drives the lifecycle and the per-message redelivery decision.

use crate::config::Configuration;
use crate::consumer::Headers;
use crate::error::ClientError;
use crate::message::Message;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Per-message dispatch callback handed to `subscribe`.
///
/// The transport invokes it for every message delivered on the subscribed
/// queue, on whatever task/thread it delivers on. Errors returned by the
/// callback propagate to the transport, which decides what to do with them.
pub type OnMessage =
    Arc<dyn Fn(Message) -> BoxFuture<'static, Result<(), ClientError>> + Send + Sync>;

/// A connected session with a message broker.
///
/// The supervision layer expects:
/// - `connect` before any subscription
/// - `subscribe` once per registered queue, in registration order
/// - `runloop` to block, driving message delivery, until `close` is called
/// - `unreceive` to request redelivery / dead-lettering when the transport
///   supports it (`can_unreceive`)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Establish a transport session with the resolved configuration.
    async fn connect(&self, config: &Configuration) -> Result<(), ClientError>;

    /// Register a per-queue message callback.
    async fn subscribe(
        &self,
        queue: &str,
        headers: &Headers,
        on_message: OnMessage,
    ) -> Result<(), ClientError>;

    /// Block, driving message delivery, until the client is closed.
    async fn runloop(&self) -> Result<(), ClientError>;

    /// Whether this transport supports redelivery / dead-lettering.
    fn can_unreceive(&self) -> bool;

    /// Return a message to the broker for another delivery attempt,
    /// subject to the `dead_letter_queue` / `max_redeliveries` headers.
    async fn unreceive(&self, message: Message, headers: Headers) -> Result<(), ClientError>;

    /// Close the transport session. Causes a blocked `runloop` to return.
    async fn close(&self) -> Result<(), ClientError>;

    /// Whether the session has been closed.
    fn is_closed(&self) -> bool;
}
