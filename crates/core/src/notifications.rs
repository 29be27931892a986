//! Notification kinds, payloads and de-duplication windows.
//!
//! Notifications are a best-effort side channel. Builders here only shape
//! the message; delivery lives behind the [`Notifier`](crate::ports::Notifier)
//! port.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::disposition::{Disposition, DispositionStatus};
use crate::error::CoreError;
use crate::types::{Date, DbId, Timestamp};

/// Rolling de-duplication window for non-reminder notifications.
pub const DEFAULT_DEDUPE_MINUTES: i64 = 10;

/// Maximum characters of instruction text quoted in a message.
const PREVIEW_LEN: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DispositionAssigned,
    DispositionStatusChanged,
    DispositionCompleted,
    DispositionDelegated,
    DeadlineReminder,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::DispositionAssigned => "disposition_assigned",
            NotificationKind::DispositionStatusChanged => "disposition_status_changed",
            NotificationKind::DispositionCompleted => "disposition_completed",
            NotificationKind::DispositionDelegated => "disposition_delegated",
            NotificationKind::DeadlineReminder => "deadline_reminder",
        }
    }

    /// Start of the window in which an identical notification is suppressed.
    ///
    /// Deadline reminders are sent at most once per UTC day; everything else
    /// uses a short rolling window.
    pub fn dedupe_window_start(self, now: Timestamp) -> Timestamp {
        match self {
            NotificationKind::DeadlineReminder => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc())
                .unwrap_or(now),
            _ => now - Duration::minutes(DEFAULT_DEDUPE_MINUTES),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disposition_assigned" => Ok(NotificationKind::DispositionAssigned),
            "disposition_status_changed" => Ok(NotificationKind::DispositionStatusChanged),
            "disposition_completed" => Ok(NotificationKind::DispositionCompleted),
            "disposition_delegated" => Ok(NotificationKind::DispositionDelegated),
            "deadline_reminder" => Ok(NotificationKind::DeadlineReminder),
            other => Err(CoreError::Validation(format!(
                "Unknown notification kind '{other}'"
            ))),
        }
    }
}

/// Which disposition a notification is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContext {
    pub disposition_id: DbId,
    pub disposition_text: String,
    pub activity_id: DbId,
    /// Filled in by the dispatcher when the caller does not know it.
    pub activity_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub user_id: DbId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub context: NotificationContext,
}

impl NotificationRequest {
    fn about(d: &Disposition, user_id: DbId, kind: NotificationKind, title: &str, message: String) -> Self {
        Self {
            user_id,
            kind,
            title: title.to_string(),
            message,
            context: NotificationContext {
                disposition_id: d.id,
                disposition_text: d.instruction_text.clone(),
                activity_id: d.activity_id,
                activity_title: None,
            },
        }
    }

    /// Tell the assignee they received new work.
    pub fn assigned(d: &Disposition) -> Self {
        Self::about(
            d,
            d.assigned_to,
            NotificationKind::DispositionAssigned,
            "New disposition",
            format!("You have been assigned: {}", preview(&d.instruction_text)),
        )
    }

    /// Tell the assignee someone else changed the status.
    pub fn status_changed(d: &Disposition, old: DispositionStatus) -> Self {
        Self::about(
            d,
            d.assigned_to,
            NotificationKind::DispositionStatusChanged,
            "Disposition status changed",
            format!("Status changed from {old} to {}", d.status),
        )
    }

    /// Tell the creator the work is done.
    pub fn completed(d: &Disposition) -> Self {
        Self::about(
            d,
            d.created_by,
            NotificationKind::DispositionCompleted,
            "Disposition completed",
            format!("Completed: {}", preview(&d.instruction_text)),
        )
    }

    /// Tell the new assignee the disposition was delegated to them.
    pub fn delegated(d: &Disposition) -> Self {
        Self::about(
            d,
            d.assigned_to,
            NotificationKind::DispositionDelegated,
            "Disposition delegated to you",
            format!("Delegated to you: {}", preview(&d.instruction_text)),
        )
    }

    /// Remind the assignee that the deadline is close or passed.
    pub fn deadline_reminder(d: &Disposition, today: Date) -> Option<Self> {
        let deadline = d.deadline?;
        let days = (deadline - today).num_days();
        let message = match days {
            n if n < 0 => format!("Overdue since {deadline}"),
            0 => "Due today".to_string(),
            1 => "Due tomorrow".to_string(),
            n => format!("Due in {n} days ({deadline})"),
        };
        Some(Self::about(
            d,
            d.assigned_to,
            NotificationKind::DeadlineReminder,
            "Disposition deadline approaching",
            message,
        ))
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_LEN {
        text.to_string()
    } else {
        let cut: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{cut}...")
    }
}
