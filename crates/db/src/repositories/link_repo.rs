//! Calls into the atomic link/unlink procedures.

use sqlx::PgPool;
use surat_core::types::DbId;

pub struct LinkRepo;

impl LinkRepo {
    /// Run `link_letter_to_activity`. `payload` is the JSON object the
    /// procedure expects (`assignees`, `instruction_text`, `deadline`,
    /// `attachments`, `created_by`, `created_at`).
    pub async fn link(
        pool: &PgPool,
        letter_id: DbId,
        activity_id: DbId,
        payload: &serde_json::Value,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT link_letter_to_activity($1, $2, $3)")
            .bind(letter_id)
            .bind(activity_id)
            .bind(payload)
            .fetch_one(pool)
            .await
    }

    pub async fn unlink(pool: &PgPool, letter_id: DbId, activity_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT unlink_letter_from_activity($1, $2)")
            .bind(letter_id)
            .bind(activity_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
