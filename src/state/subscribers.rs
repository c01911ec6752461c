use axum::extract::ws::Message;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifier handed to each viewer when it attaches to a run.
pub type SubscriberId = Uuid;

/// Handle used to push messages to a connected viewer.
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Unique per attach.
    pub id: SubscriberId,
    /// Queue drained by the viewer's socket writer.
    pub tx: mpsc::UnboundedSender<Message>,
}

impl Subscriber {
    /// Create a subscriber with a fresh identifier, returning the receiving end of its queue.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }
}

/// Failure to hand a message to one viewer.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The viewer's writer is gone.
    #[error("subscriber connection closed")]
    ConnectionClosed,
    /// The payload could not be encoded.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Serialize a payload and push it onto a single viewer's queue.
pub fn send_json<T>(tx: &mpsc::UnboundedSender<Message>, value: &T) -> Result<(), DeliveryError>
where
    T: ?Sized + Serialize,
{
    let payload = serde_json::to_string(value)?;
    tx.send(Message::Text(payload.into()))
        .map_err(|_| DeliveryError::ConnectionClosed)
}

/// Outcome of a broadcast.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Viewers whose queue accepted the payload.
    pub delivered: usize,
    /// Viewers whose queue was closed.
    pub failed: Vec<SubscriberId>,
}

/// Set of viewers attached to one run.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    connections: DashMap<SubscriberId, Subscriber>,
}

impl SubscriberRegistry {
    /// Add a viewer; attaching the same id twice replaces the previous handle.
    pub fn attach(&self, subscriber: Subscriber) {
        debug!(subscriber = %subscriber.id, "subscriber attached");
        self.connections.insert(subscriber.id, subscriber);
    }

    /// Remove a viewer, returning whether it was attached.
    pub fn detach(&self, id: SubscriberId) -> bool {
        let removed = self.connections.remove(&id).is_some();
        if removed {
            debug!(subscriber = %id, "subscriber detached");
        }
        removed
    }

    /// Whether no viewer is attached.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of attached viewers.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Send the same payload to every viewer.
    ///
    /// The payload is encoded once. A viewer whose queue is closed is reported and skipped; the
    /// remaining viewers still receive the message.
    pub fn broadcast<T>(&self, value: &T) -> Result<BroadcastReport, DeliveryError>
    where
        T: ?Sized + Serialize,
    {
        let message = Message::Text(serde_json::to_string(value)?.into());
        let mut report = BroadcastReport::default();

        for connection in self.connections.iter() {
            if connection.tx.send(message.clone()).is_ok() {
                report.delivered += 1;
            } else {
                warn!(
                    subscriber = %connection.id,
                    error = %DeliveryError::ConnectionClosed,
                    "failed to deliver run update"
                );
                report.failed.push(connection.id);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(message: Message) -> String {
        match message {
            Message::Text(text) => text.to_string(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[test]
    fn broadcast_reaches_every_subscriber() {
        let registry = SubscriberRegistry::default();
        let (first, mut first_rx) = Subscriber::new();
        let (second, mut second_rx) = Subscriber::new();
        registry.attach(first);
        registry.attach(second);

        let report = registry.broadcast(&serde_json::json!({"n": 1})).unwrap();
        assert_eq!(report.delivered, 2);
        assert_eq!(text(first_rx.try_recv().unwrap()), r#"{"n":1}"#);
        assert_eq!(text(second_rx.try_recv().unwrap()), r#"{"n":1}"#);
    }

    #[test]
    fn closed_subscriber_does_not_abort_broadcast() {
        let registry = SubscriberRegistry::default();
        let (gone, gone_rx) = Subscriber::new();
        let (alive, mut alive_rx) = Subscriber::new();
        let gone_id = gone.id;
        registry.attach(gone);
        registry.attach(alive);
        drop(gone_rx);

        let report = registry.broadcast("tick").unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec![gone_id]);
        assert_eq!(text(alive_rx.try_recv().unwrap()), r#""tick""#);
    }

    #[test]
    fn detach_reports_membership() {
        let registry = SubscriberRegistry::default();
        let (subscriber, _rx) = Subscriber::new();
        let id = subscriber.id;
        registry.attach(subscriber);

        assert_eq!(registry.len(), 1);
        assert!(registry.detach(id));
        assert!(!registry.detach(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn send_json_reports_closed_queue() {
        let (subscriber, rx) = Subscriber::new();
        drop(rx);
        assert!(matches!(
            send_json(&subscriber.tx, &serde_json::json!({})),
            Err(DeliveryError::ConnectionClosed)
        ));
    }
}
