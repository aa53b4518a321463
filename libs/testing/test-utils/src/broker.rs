//! In-memory broker client for exercising worker lifecycles in tests.

use async_trait::async_trait;
use broker_worker::{BrokerClient, ClientError, Configuration, Headers, Message, OnMessage};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Notify;
use tracing::debug;

/// An in-memory `BrokerClient` with scripted deliveries.
///
/// `runloop` delivers every scripted message to the matching subscription
/// callback in subscription order, then parks until `close` is called,
/// mirroring a real broker's blocking runloop. Redelivery requests and
/// close calls are recorded for assertions.
pub struct ScriptedBroker {
    can_unreceive: bool,
    fail_close: bool,
    closed: AtomicBool,
    close_calls: AtomicU32,
    notify: Notify,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    connected_with: Option<Configuration>,
    deliveries: HashMap<String, Vec<Message>>,
    subscriptions: Vec<(String, Headers, OnMessage)>,
    unreceived: Vec<(Message, Headers)>,
}

impl ScriptedBroker {
    /// A broker that supports redelivery.
    pub fn new() -> Self {
        Self {
            can_unreceive: true,
            fail_close: false,
            closed: AtomicBool::new(false),
            close_calls: AtomicU32::new(0),
            notify: Notify::new(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// A broker whose transport cannot redeliver (`can_unreceive` false).
    pub fn without_unreceive() -> Self {
        Self {
            can_unreceive: false,
            ..Self::new()
        }
    }

    /// A broker whose `close` always fails, for exit-coordination tests.
    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::new()
        }
    }

    /// Queue a message for delivery on `queue` during `runloop`.
    pub fn script(&self, queue: &str, message: Message) {
        self.inner
            .lock()
            .unwrap()
            .deliveries
            .entry(queue.to_string())
            .or_default()
            .push(message);
    }

    /// The configuration the worker connected with, if any.
    pub fn connected_with(&self) -> Option<Configuration> {
        self.inner.lock().unwrap().connected_with.clone()
    }

    /// Subscribed queue names, in subscription order.
    pub fn subscribed_queues(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .map(|(queue, _, _)| queue.clone())
            .collect()
    }

    /// Recorded redelivery requests.
    pub fn unreceived(&self) -> Vec<(Message, Headers)> {
        self.inner.lock().unwrap().unreceived.clone()
    }

    /// How many times `close` was invoked.
    pub fn close_calls(&self) -> u32 {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerClient for ScriptedBroker {
    async fn connect(&self, config: &Configuration) -> Result<(), ClientError> {
        self.inner.lock().unwrap().connected_with = Some(config.clone());
        Ok(())
    }

    async fn subscribe(
        &self,
        queue: &str,
        headers: &Headers,
        on_message: OnMessage,
    ) -> Result<(), ClientError> {
        debug!(queue = %queue, "scripted broker subscription");
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .push((queue.to_string(), headers.clone(), on_message));
        Ok(())
    }

    async fn runloop(&self) -> Result<(), ClientError> {
        let work: Vec<(OnMessage, Vec<Message>)> = {
            let mut inner = self.inner.lock().unwrap();
            let subscribed: Vec<(String, OnMessage)> = inner
                .subscriptions
                .iter()
                .map(|(queue, _, callback)| (queue.clone(), callback.clone()))
                .collect();
            subscribed
                .into_iter()
                .map(|(queue, callback)| {
                    let messages = inner.deliveries.remove(&queue).unwrap_or_default();
                    (callback, messages)
                })
                .collect()
        };

        for (callback, messages) in work {
            for message in messages {
                callback(message).await?;
            }
        }

        // Park like a real broker runloop until the session is closed.
        while !self.closed.load(Ordering::SeqCst) {
            self.notify.notified().await;
        }
        Ok(())
    }

    fn can_unreceive(&self) -> bool {
        self.can_unreceive
    }

    async fn unreceive(&self, message: Message, headers: Headers) -> Result<(), ClientError> {
        self.inner
            .lock()
            .unwrap()
            .unreceived
            .push((message, headers));
        Ok(())
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(ClientError::close("scripted close failure"));
        }
        self.closed.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so a close racing ahead of the
        // runloop's park is never lost.
        self.notify.notify_one();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
