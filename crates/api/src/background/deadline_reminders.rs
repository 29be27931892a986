//! Periodic deadline reminders.
//!
//! Every interval, finds open dispositions whose deadline is within the
//! configured horizon (or already passed) and asks the notifier to remind
//! the assignee. The dispatcher's once-per-day window for
//! `deadline_reminder` keeps repeated sweeps from spamming anyone. The
//! sweep never writes to dispositions.

use std::sync::Arc;

use chrono::{Days, Utc};
use surat_core::error::CoreError;
use surat_core::notifications::NotificationRequest;
use surat_core::ports::{DispositionStore, Notifier};
use surat_core::types::Date;
use tokio_util::sync::CancellationToken;

use crate::config::ReminderConfig;

/// Run the reminder loop until `cancel` is triggered.
pub async fn run(
    store: Arc<dyn DispositionStore>,
    notifier: Arc<dyn Notifier>,
    config: ReminderConfig,
    cancel: CancellationToken,
) {
    tracing::info!(
        horizon_days = config.horizon_days,
        interval_secs = config.interval.as_secs(),
        "Deadline reminder job started"
    );

    let mut interval = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Deadline reminder job stopping");
                break;
            }
            _ = interval.tick() => {
                let today = Utc::now().date_naive();
                match sweep(store.as_ref(), notifier.as_ref(), today, config.horizon_days).await {
                    Ok(0) => tracing::debug!("Deadline reminders: nothing due"),
                    Ok(sent) => tracing::info!(sent, "Deadline reminders: published"),
                    Err(e) => tracing::error!(error = %e, "Deadline reminders: sweep failed"),
                }
            }
        }
    }
}

/// One pass: remind every assignee whose open disposition is due by
/// `today + horizon_days`. Returns how many reminders were published.
///
/// A failing notification is logged and skipped.
pub async fn sweep(
    store: &dyn DispositionStore,
    notifier: &dyn Notifier,
    today: Date,
    horizon_days: i64,
) -> Result<usize, CoreError> {
    let horizon = Days::new(horizon_days.max(0) as u64);
    let until = today.checked_add_days(horizon).unwrap_or(today);
    let due = store.list_due_by(until).await?;

    let mut sent = 0;
    for disposition in &due {
        let Some(request) = NotificationRequest::deadline_reminder(disposition, today) else {
            continue;
        };
        match notifier.notify(request).await {
            Ok(()) => sent += 1,
            Err(e) => tracing::warn!(
                disposition_id = %disposition.id,
                user_id = %disposition.assigned_to,
                error = %e,
                "Failed to publish deadline reminder"
            ),
        }
    }
    Ok(sent)
}
