//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surat_core::notifications::{NotificationKind, NotificationRequest};
use surat_core::types::DbId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// DispositionEvent
// ---------------------------------------------------------------------------

/// Something happened to a disposition that a user should hear about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispositionEvent {
    /// Dot-separated event name, e.g. `"disposition.assigned"`.
    pub event_type: String,

    /// Optional id of the user whose action caused the event.
    pub actor_user_id: Option<DbId>,

    /// The notification to deliver.
    pub notification: NotificationRequest,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl DispositionEvent {
    pub fn new(notification: NotificationRequest) -> Self {
        Self {
            event_type: event_type_for(notification.kind).to_string(),
            actor_user_id: None,
            notification,
            timestamp: Utc::now(),
        }
    }

    /// Attach the acting user to the event.
    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn disposition_id(&self) -> DbId {
        self.notification.context.disposition_id
    }

    pub fn recipient_id(&self) -> DbId {
        self.notification.user_id
    }
}

fn event_type_for(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::DispositionAssigned => "disposition.assigned",
        NotificationKind::DispositionStatusChanged => "disposition.status_changed",
        NotificationKind::DispositionCompleted => "disposition.completed",
        NotificationKind::DispositionDelegated => "disposition.delegated",
        NotificationKind::DeadlineReminder => "disposition.deadline_reminder",
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// When the buffer is full the oldest un-consumed events are dropped and
/// slow receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<DispositionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that will see it; zero means the
    /// event was dropped.
    pub fn publish(&self, event: DispositionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<DispositionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use surat_core::notifications::NotificationContext;
    use uuid::Uuid;

    use super::*;

    fn request(kind: NotificationKind) -> NotificationRequest {
        NotificationRequest {
            user_id: Uuid::new_v4(),
            kind,
            title: "New disposition".into(),
            message: "You have been assigned: Review draft".into(),
            context: NotificationContext {
                disposition_id: Uuid::new_v4(),
                disposition_text: "Review draft".into(),
                activity_id: Uuid::new_v4(),
                activity_title: None,
            },
        }
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let actor = Uuid::new_v4();
        let req = request(NotificationKind::DispositionAssigned);

        assert_eq!(bus.publish(DispositionEvent::new(req.clone()).with_actor(actor)), 1);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "disposition.assigned");
        assert_eq!(received.actor_user_id, Some(actor));
        assert_eq!(received.recipient_id(), req.user_id);
        assert_eq!(received.disposition_id(), req.context.disposition_id);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(DispositionEvent::new(request(NotificationKind::DeadlineReminder)));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.event_type, "disposition.deadline_reminder");
        assert_eq!(e2.event_type, "disposition.deadline_reminder");
    }

    #[test]
    fn publish_with_no_subscribers_is_dropped() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(
            bus.publish(DispositionEvent::new(request(NotificationKind::DispositionCompleted))),
            0
        );
    }
}
