//! Consumer registration: queue name, subscription options, handler.
//!
//! Handlers report success or failure as a plain boolean. A `false` return
//! is what triggers the redelivery decision during dispatch; exceptions
//! never do, and this crate deliberately does not wrap the boolean in a
//! richer result type.

use crate::error::WorkerError;
use crate::message::Message;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Subscription options: recognized redelivery keys plus whatever else the
/// transport wants to see at subscribe time.
pub type Headers = HashMap<String, serde_json::Value>;

/// Per-queue message handler. Returns `true` when the message was handled.
pub type Handler = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

/// Option key naming the dead-letter destination.
pub const DEAD_LETTER_QUEUE: &str = "dead_letter_queue";

/// Option key bounding the redelivery count.
pub const MAX_REDELIVERIES: &str = "max_redeliveries";

/// Builder for one queue subscription.
///
/// # Example
///
/// ```rust,ignore
/// use broker_worker::{Consumer, DEAD_LETTER_QUEUE, MAX_REDELIVERIES};
///
/// worker.consume(
///     Consumer::queue("/queue/orders")
///         .option(DEAD_LETTER_QUEUE, "/queue/orders_dlq")
///         .option(MAX_REDELIVERIES, 3)
///         .handler(|message| process_order(message.body()).is_ok()),
/// )?;
/// ```
pub struct Consumer {
    queue: String,
    options: Headers,
    handler: Option<Handler>,
}

impl Consumer {
    /// Start a registration for a queue.
    pub fn queue(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            options: Headers::new(),
            handler: None,
        }
    }

    /// Replace all subscription options.
    pub fn options(mut self, options: Headers) -> Self {
        self.options = options;
        self
    }

    /// Set a single subscription option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Set the message handler.
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Finalize the registration. Fails fast when no handler was supplied.
    pub fn build(self) -> Result<ConsumerEntry, WorkerError> {
        let handler = self.handler.ok_or_else(|| {
            WorkerError::consume(format!("no handler registered for queue '{}'", self.queue))
        })?;

        Ok(ConsumerEntry {
            queue: self.queue,
            options: self.options,
            handler,
        })
    }
}

/// An immutable, registered queue subscription.
///
/// The stored options are never mutated by dispatch: building redelivery
/// headers copies the recognized keys into a fresh map.
#[derive(Clone)]
pub struct ConsumerEntry {
    queue: String,
    options: Headers,
    handler: Handler,
}

impl ConsumerEntry {
    /// The queue this entry subscribes to.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// The subscription options as registered.
    pub fn options(&self) -> &Headers {
        &self.options
    }

    /// Invoke the handler for a delivered message.
    pub fn handle(&self, message: &Message) -> bool {
        (self.handler)(message)
    }

    /// Header map for a redelivery request: exactly the recognized keys
    /// present in the registered options, nothing else.
    pub fn unreceive_headers(&self) -> Headers {
        let mut headers = Headers::new();
        for key in [DEAD_LETTER_QUEUE, MAX_REDELIVERIES] {
            if let Some(value) = self.options.get(key) {
                headers.insert(key.to_string(), value.clone());
            }
        }
        headers
    }
}

impl fmt::Debug for ConsumerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerEntry")
            .field("queue", &self.queue)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_without_handler_fails() {
        let err = Consumer::queue("/queue/orders").build().unwrap_err();
        assert!(matches!(err, WorkerError::Consume(_)));
        assert!(err.to_string().contains("/queue/orders"));
    }

    #[test]
    fn test_build_with_handler() {
        let entry = Consumer::queue("/queue/orders")
            .option("prefetch", 10)
            .handler(|_| true)
            .build()
            .unwrap();

        assert_eq!(entry.queue(), "/queue/orders");
        assert_eq!(entry.options().get("prefetch"), Some(&json!(10)));
        assert!(entry.handle(&Message::new("/queue/orders", "x")));
    }

    #[test]
    fn test_unreceive_headers_filters_unrecognized_keys() {
        let entry = Consumer::queue("/queue/some_queue")
            .option(DEAD_LETTER_QUEUE, "/queue/foo")
            .option(MAX_REDELIVERIES, 3)
            .option("other_header", "foo!")
            .handler(|_| false)
            .build()
            .unwrap();

        let headers = entry.unreceive_headers();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get(DEAD_LETTER_QUEUE), Some(&json!("/queue/foo")));
        assert_eq!(headers.get(MAX_REDELIVERIES), Some(&json!(3)));
        assert!(!headers.contains_key("other_header"));

        // Filtering copies; the registered options keep every key.
        assert_eq!(entry.options().len(), 3);
        assert_eq!(entry.options().get("other_header"), Some(&json!("foo!")));
    }

    #[test]
    fn test_unreceive_headers_partial_keys() {
        let entry = Consumer::queue("/queue/q")
            .option(DEAD_LETTER_QUEUE, "/queue/dlq")
            .handler(|_| false)
            .build()
            .unwrap();

        let headers = entry.unreceive_headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(DEAD_LETTER_QUEUE), Some(&json!("/queue/dlq")));
    }

    #[test]
    fn test_unreceive_headers_empty_without_redelivery_keys() {
        let entry = Consumer::queue("/queue/q")
            .option("other_header", "x")
            .handler(|_| false)
            .build()
            .unwrap();

        assert!(entry.unreceive_headers().is_empty());
    }
}
