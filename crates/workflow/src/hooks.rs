//! Post-commit side effects.
//!
//! Notifications are queued while an operation runs and only sent once the
//! primary write has succeeded. Each one is isolated: a failure is logged and
//! the rest still run.

use surat_core::notifications::NotificationRequest;
use surat_core::ports::Notifier;
use surat_core::types::DbId;

#[derive(Debug, Default)]
#[must_use = "queued notifications are only sent by `run`"]
pub struct PostCommit {
    notifications: Vec<NotificationRequest>,
}

impl PostCommit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&mut self, request: NotificationRequest) {
        self.notifications.push(request);
    }

    /// Queue `request` unless the actor would be notifying themselves.
    pub fn notify_unless_actor(&mut self, request: NotificationRequest, actor_id: DbId) {
        if request.user_id != actor_id {
            self.notify(request);
        }
    }

    /// Send every queued notification. Never fails.
    pub async fn run(self, notifier: &dyn Notifier) {
        for request in self.notifications {
            let user_id = request.user_id;
            let kind = request.kind;
            let disposition_id = request.context.disposition_id;
            if let Err(e) = notifier.notify(request).await {
                tracing::warn!(
                    %user_id,
                    %disposition_id,
                    kind = %kind,
                    error = %e,
                    "Notification failed"
                );
            }
        }
    }
}
