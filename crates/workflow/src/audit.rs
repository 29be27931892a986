//! Append-only audit trail for dispositions.
//!
//! Entries are stamped here (id, `performed_at`) and never updated. A failed
//! write is logged and swallowed: the business change it documents has
//! already happened and must not be undone by the audit side-effect.

use std::sync::Arc;

use chrono::Utc;
use surat_core::disposition::{HistoryAction, HistoryEntry, NewHistoryEntry};
use surat_core::error::CoreError;
use surat_core::ports::HistoryStore;
use surat_core::retry::{with_retry, RetryPolicy};
use surat_core::types::DbId;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn HistoryStore>,
    retry: RetryPolicy,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn HistoryStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Append one entry. Returns `None` when the write failed.
    pub async fn record(&self, entry: NewHistoryEntry) -> Option<HistoryEntry> {
        // v7 ids sort by creation and break `performed_at` ties.
        let stamped = HistoryEntry {
            id: Uuid::now_v7(),
            disposition_id: entry.disposition_id,
            action: entry.action,
            old_value: entry.old_value,
            new_value: entry.new_value,
            performed_by: entry.performed_by,
            performed_at: Utc::now(),
        };

        match with_retry(&self.retry, "append_history", || self.store.append(&stamped)).await {
            Ok(()) => {
                tracing::debug!(
                    disposition_id = %stamped.disposition_id,
                    action = %stamped.action,
                    "History entry recorded"
                );
                Some(stamped)
            }
            Err(e) => {
                tracing::error!(
                    disposition_id = %stamped.disposition_id,
                    action = %stamped.action,
                    error = %e,
                    "Failed to record history entry"
                );
                None
            }
        }
    }

    /// Shorthand for [`record`](Self::record).
    pub async fn change(
        &self,
        disposition_id: DbId,
        action: HistoryAction,
        old_value: Option<String>,
        new_value: Option<String>,
        performed_by: DbId,
    ) -> Option<HistoryEntry> {
        self.record(NewHistoryEntry {
            disposition_id,
            action,
            old_value,
            new_value,
            performed_by,
        })
        .await
    }

    /// All entries for a disposition, newest first. Works for deleted
    /// dispositions too.
    pub async fn history(&self, disposition_id: DbId) -> Result<Vec<HistoryEntry>, CoreError> {
        let mut entries = with_retry(&self.retry, "list_history", || {
            self.store.list_for_disposition(disposition_id)
        })
        .await?;
        entries.sort_by(|a, b| (b.performed_at, b.id).cmp(&(a.performed_at, a.id)));
        Ok(entries)
    }
}
