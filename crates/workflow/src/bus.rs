//! In-process fan-out of persisted notifications.

use domain::Notification;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// Broadcasts every persisted notification to live subscribers.
///
/// Owned by the composition root and handed to the dispatcher, so there is no
/// process-wide subscriber registry. Publishing never blocks and never fails:
/// with no subscribers the notification is simply dropped, and a subscriber
/// that falls more than `capacity` messages behind skips the oldest ones.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes a notification. Returns how many subscribers received it.
    pub fn publish(&self, notification: Notification) -> usize {
        self.sender.send(notification).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
