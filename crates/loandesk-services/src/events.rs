//! Admin event bus
//!
//! Publish/subscribe fan-out of submission events to connected admin
//! dashboards. Delivery is best-effort: nobody listening is not an error.

use loandesk_core::models::{NotificationEvent, ADMIN_CHANNEL, NEW_SUBMISSION_EVENT};
use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Frame delivered to subscribers: `{"event": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminEvent {
    pub event: String,
    pub data: NotificationEvent,
}

impl AdminEvent {
    pub fn new_submission(data: NotificationEvent) -> Self {
        Self {
            event: NEW_SUBMISSION_EVENT.to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminEventBus {
    sender: broadcast::Sender<AdminEvent>,
}

impl AdminEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: AdminEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::info!(channel = ADMIN_CHANNEL, receivers, "Admin event published");
                receivers
            }
            Err(broadcast::error::SendError(event)) => {
                tracing::debug!(
                    channel = ADMIN_CHANNEL,
                    event = %event.event,
                    "No admin subscribers connected"
                );
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdminEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AdminEventBus {
    fn default() -> Self {
        Self::new()
    }
}
