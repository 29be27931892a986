//! Disposition history row.

use sqlx::FromRow;
use surat_core::disposition::HistoryEntry;
use surat_core::error::CoreError;
use surat_core::types::{DbId, Timestamp};

/// A row from the `disposition_history` table.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: DbId,
    pub disposition_id: DbId,
    pub action: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub performed_by: DbId,
    pub performed_at: Timestamp,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = CoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let action = row.action.parse().map_err(|_| CoreError::Database {
            message: format!("Unknown history action '{}' in row {}", row.action, row.id),
            transient: false,
        })?;
        Ok(HistoryEntry {
            id: row.id,
            disposition_id: row.disposition_id,
            action,
            old_value: row.old_value,
            new_value: row.new_value,
            performed_by: row.performed_by,
            performed_at: row.performed_at,
        })
    }
}
