//! The workflow's `Notifier` port, backed by the event bus.

use std::sync::Arc;

use async_trait::async_trait;
use surat_core::error::CoreError;
use surat_core::notifications::NotificationRequest;
use surat_core::ports::Notifier;

use crate::bus::{DispositionEvent, EventBus};

/// Publishes notification requests for the dispatcher to store.
///
/// Publishing never blocks; it fails only when nothing is subscribed.
#[derive(Clone)]
pub struct BusNotifier {
    bus: Arc<EventBus>,
}

impl BusNotifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl Notifier for BusNotifier {
    async fn notify(&self, request: NotificationRequest) -> Result<(), CoreError> {
        let kind = request.kind;
        let user_id = request.user_id;
        if self.bus.publish(DispositionEvent::new(request)) == 0 {
            return Err(CoreError::Notification(format!(
                "No dispatcher subscribed; dropped {kind} for user {user_id}"
            )));
        }
        Ok(())
    }
}
