//! Repository for the append-only `disposition_history` table.

use sqlx::PgPool;
use surat_core::disposition::HistoryEntry;
use surat_core::types::DbId;

use crate::models::history::HistoryRow;

const COLUMNS: &str =
    "id, disposition_id, action, old_value, new_value, performed_by, performed_at";

pub struct DispositionHistoryRepo;

impl DispositionHistoryRepo {
    pub async fn append(pool: &PgPool, entry: &HistoryEntry) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO disposition_history ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        sqlx::query(&query)
            .bind(entry.id)
            .bind(entry.disposition_id)
            .bind(entry.action.as_str())
            .bind(&entry.old_value)
            .bind(&entry.new_value)
            .bind(entry.performed_by)
            .bind(entry.performed_at)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Entries for one disposition, newest first.
    pub async fn list_for_disposition(
        pool: &PgPool,
        disposition_id: DbId,
    ) -> Result<Vec<HistoryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM disposition_history \
             WHERE disposition_id = $1 \
             ORDER BY performed_at DESC, id DESC"
        );
        sqlx::query_as::<_, HistoryRow>(&query)
            .bind(disposition_id)
            .fetch_all(pool)
            .await
    }
}
