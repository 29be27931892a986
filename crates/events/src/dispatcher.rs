//! Event-to-notification delivery.
//!
//! [`NotificationDispatcher`] subscribes to the [`EventBus`](crate::EventBus)
//! and stores one in-app notification per event, unless an identical one
//! (same user, disposition and kind) is already inside the kind's
//! de-duplication window. Failures are logged; the loop keeps running.

use chrono::Utc;
use surat_core::notifications::NotificationRequest;
use surat_db::models::notification::{CreateNotification, Notification};
use surat_db::repositories::{ActivityRepo, NotificationRepo};
use surat_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::DispositionEvent;

pub struct NotificationDispatcher {
    pool: DbPool,
}

impl NotificationDispatcher {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Run the delivery loop until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<DispositionEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.dispatch(&event.notification).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            user_id = %event.recipient_id(),
                            disposition_id = %event.disposition_id(),
                            "Failed to store notification"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification dispatcher lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification dispatcher shutting down");
                    break;
                }
            }
        }
    }

    /// Store one notification. Returns `None` when it was suppressed as a
    /// duplicate.
    pub async fn dispatch(
        &self,
        request: &NotificationRequest,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let mut input = CreateNotification::from(request);
        if input.activity_title.is_none() {
            input.activity_title = ActivityRepo::title(&self.pool, request.context.activity_id).await?;
        }

        let since = request.kind.dedupe_window_start(Utc::now());
        let stored = NotificationRepo::create_unless_recent(&self.pool, &input, since).await?;

        match &stored {
            Some(n) => tracing::debug!(
                notification_id = %n.id,
                user_id = %request.user_id,
                kind = %request.kind,
                "Notification stored"
            ),
            None => tracing::debug!(
                user_id = %request.user_id,
                disposition_id = %request.context.disposition_id,
                kind = %request.kind,
                "Duplicate notification suppressed"
            ),
        }
        Ok(stored)
    }
}
