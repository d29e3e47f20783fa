use thiserror::Error;
use tokio::sync::broadcast;

use super::notification_models::Notification;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DispatchError {
    /// Nobody was connected when the message was published; it is dropped.
    #[error("no notification subscribers connected")]
    NoSubscribers,
}

/// Fire-and-forget fan-out to whoever is subscribed right now.
///
/// Implementations must not block: a slow subscriber may lose messages but
/// never delays the publisher.
pub trait Broadcaster: Send + Sync {
    /// Returns how many subscribers the message was handed to. Nothing is
    /// retried on error.
    fn publish(&self, notification: Notification) -> Result<usize, DispatchError>;
}

/// Process-wide notification channel backed by `tokio::sync::broadcast`.
///
/// No backlog is kept: a subscriber only sees what is published after it
/// subscribed.
#[derive(Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<Notification>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Broadcaster for NotificationHub {
    fn publish(&self, notification: Notification) -> Result<usize, DispatchError> {
        self.tx
            .send(notification)
            .map_err(|_| DispatchError::NoSubscribers)
    }
}
