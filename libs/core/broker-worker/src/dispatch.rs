//! Per-message dispatch: handler invocation and the redelivery decision.
//!
//! The decision is driven solely by the handler's boolean return value:
//!
//! 1. Handler returns `true`: done; acknowledgement is the transport's
//!    responsibility.
//! 2. Handler returns `false`: if the client supports redelivery and the
//!    registered options carry at least one recognized redelivery key,
//!    `unreceive` is called exactly once with a fresh header map holding
//!    only those keys. The stored options are never touched.
//!
//! Handler panics and transport errors propagate to the transport/caller.

use crate::client::{BrokerClient, OnMessage};
use crate::consumer::ConsumerEntry;
use crate::message::Message;
use crate::metrics::WorkerMetrics;
use crate::worker::LogSink;
use std::sync::Arc;
use tracing::{debug, warn};

/// Build the dispatch callback for one consumer entry.
pub(crate) fn on_message(
    client: Arc<dyn BrokerClient>,
    entry: Arc<ConsumerEntry>,
    log_sink: Option<LogSink>,
    metrics: WorkerMetrics,
) -> OnMessage {
    Arc::new(move |message: Message| {
        let client = Arc::clone(&client);
        let entry = Arc::clone(&entry);
        let log_sink = log_sink.clone();
        let metrics = metrics.clone();

        Box::pin(async move {
            metrics.message_received(entry.queue());

            let ok = match &log_sink {
                Some(sink) => {
                    tracing::dispatcher::with_default(&sink(), || entry.handle(&message))
                }
                None => entry.handle(&message),
            };

            if ok {
                metrics.message_handled(entry.queue());
                return Ok(());
            }

            metrics.handler_failed(entry.queue());
            debug!(queue = %entry.queue(), "handler reported failure");

            if !client.can_unreceive() {
                return Ok(());
            }

            let headers = entry.unreceive_headers();
            if headers.is_empty() {
                return Ok(());
            }

            warn!(
                queue = %entry.queue(),
                destination = %message.destination(),
                "requesting redelivery"
            );
            metrics.unreceive_requested(entry.queue());
            client.unreceive(message, headers).await
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockBrokerClient;
    use crate::consumer::{Consumer, DEAD_LETTER_QUEUE, MAX_REDELIVERIES};
    use serde_json::json;

    fn entry_with_redelivery(ok: bool) -> Arc<ConsumerEntry> {
        Arc::new(
            Consumer::queue("/queue/some_queue")
                .option(DEAD_LETTER_QUEUE, "/queue/foo")
                .option(MAX_REDELIVERIES, 3)
                .option("other_header", "foo!")
                .handler(move |_| ok)
                .build()
                .unwrap(),
        )
    }

    async fn dispatch(client: MockBrokerClient, entry: Arc<ConsumerEntry>) {
        let callback = on_message(Arc::new(client), entry, None, WorkerMetrics::new("test"));

        let message = Message::new("/queue/some_queue", "test msg");
        callback(message).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_message_without_redelivery_keys_never_unreceives() {
        let entry = Arc::new(
            Consumer::queue("/queue/some_queue")
                .handler(|_| false)
                .build()
                .unwrap(),
        );

        let mut client = MockBrokerClient::new();
        client.expect_can_unreceive().return_const(true);
        client.expect_unreceive().never();

        dispatch(client, entry).await;
    }

    #[tokio::test]
    async fn test_successful_message_never_unreceives() {
        let mut client = MockBrokerClient::new();
        client.expect_can_unreceive().return_const(true);
        client.expect_unreceive().never();

        dispatch(client, entry_with_redelivery(true)).await;
    }

    #[tokio::test]
    async fn test_failed_message_unreceives_once_with_filtered_headers() {
        let mut client = MockBrokerClient::new();
        client.expect_can_unreceive().return_const(true);
        client
            .expect_unreceive()
            .withf(|_, headers| {
                headers.len() == 2
                    && headers.get(DEAD_LETTER_QUEUE) == Some(&json!("/queue/foo"))
                    && headers.get(MAX_REDELIVERIES) == Some(&json!(3))
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let entry = entry_with_redelivery(false);
        dispatch(client, Arc::clone(&entry)).await;

        // The registered options survive dispatch untouched.
        assert_eq!(entry.options().get("other_header"), Some(&json!("foo!")));
        assert_eq!(entry.options().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_message_on_incapable_client_never_unreceives() {
        let mut client = MockBrokerClient::new();
        client.expect_can_unreceive().return_const(false);
        client.expect_unreceive().never();

        dispatch(client, entry_with_redelivery(false)).await;
    }

    #[tokio::test]
    async fn test_log_sink_scope_does_not_change_the_decision() {
        let mut client = MockBrokerClient::new();
        client.expect_can_unreceive().return_const(true);
        client.expect_unreceive().times(1).returning(|_, _| Ok(()));

        let callback = on_message(
            Arc::new(client),
            entry_with_redelivery(false),
            Some(Arc::new(tracing::Dispatch::none)),
            WorkerMetrics::new("test"),
        );

        let message = Message::new("/queue/some_queue", "body");
        callback(message).await.unwrap();
    }
}
