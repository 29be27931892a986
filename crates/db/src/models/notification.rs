//! Notification rows.

use serde::Serialize;
use sqlx::FromRow;
use surat_core::notifications::NotificationRequest;
use surat_core::types::{DbId, Timestamp};

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub disposition_id: Option<DbId>,
    pub activity_id: Option<DbId>,
    pub activity_title: Option<String>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for inserting a notification.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: DbId,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub disposition_id: Option<DbId>,
    pub activity_id: Option<DbId>,
    pub activity_title: Option<String>,
}

impl From<&NotificationRequest> for CreateNotification {
    fn from(request: &NotificationRequest) -> Self {
        Self {
            user_id: request.user_id,
            kind: request.kind.as_str().to_string(),
            title: request.title.clone(),
            message: request.message.clone(),
            disposition_id: Some(request.context.disposition_id),
            activity_id: Some(request.context.activity_id),
            activity_title: request.context.activity_title.clone(),
        }
    }
}
