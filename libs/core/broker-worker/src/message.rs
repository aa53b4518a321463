//! Message wrapper delivered by the transport.
//!
//! Messages are read-only from the dispatch engine's perspective: the
//! engine routes them to handlers and, on failure, hands them back to the
//! client for redelivery, but never edits payload or headers.

use std::borrow::Cow;
use std::collections::HashMap;

/// A message delivered on a queue: destination, wire headers, opaque body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    destination: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Message {
    /// Create a new message for a destination.
    pub fn new(destination: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            destination: destination.into(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Attach a single wire header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Replace all wire headers.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// The queue/destination this message was delivered on.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// All wire headers.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Look up a single wire header.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// The broker-assigned message id, when the transport sets one.
    pub fn message_id(&self) -> Option<&str> {
        self.header("message-id")
    }

    /// The raw payload.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The payload as text (lossy for non-UTF-8 bodies).
    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup() {
        let message = Message::new("/queue/orders", "payload")
            .with_header("message-id", "msg-42")
            .with_header("content-type", "text/plain");

        assert_eq!(message.destination(), "/queue/orders");
        assert_eq!(message.message_id(), Some("msg-42"));
        assert_eq!(message.header("content-type"), Some("text/plain"));
        assert_eq!(message.header("missing"), None);
    }

    #[test]
    fn test_body_str() {
        let message = Message::new("/queue/orders", "hello");
        assert_eq!(message.body_str(), "hello");
        assert_eq!(message.body(), b"hello");
    }
}
