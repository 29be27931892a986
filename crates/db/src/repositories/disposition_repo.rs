//! Repository for the `dispositions` table.

use sqlx::types::Json;
use sqlx::PgPool;
use surat_core::disposition::Disposition;
use surat_core::types::{Date, DbId};

use crate::models::disposition::DispositionRow;

/// Column list for `dispositions` queries.
const COLUMNS: &str = "\
    id, letter_id, activity_id, assigned_to, instruction_text, status, deadline, \
    reports, attachments, notes, created_by, created_at, updated_at, \
    completed_at, completed_by, parent_disposition_id";

pub struct DispositionRepo;

impl DispositionRepo {
    /// Insert a fully materialized disposition into an existing link.
    ///
    /// Returns `false` without writing when the activity is not linked to
    /// the disposition's letter. Re-sending a row whose id is already stored
    /// succeeds without writing.
    pub async fn insert(pool: &PgPool, d: &Disposition) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Share lock: unlink and delete take the activity row FOR UPDATE.
        let linked: Option<Option<DbId>> = sqlx::query_scalar(
            "SELECT linked_letter_id FROM activities WHERE id = $1 FOR SHARE",
        )
        .bind(d.activity_id)
        .fetch_optional(&mut *tx)
        .await?;
        if linked.flatten() != Some(d.letter_id) {
            return Ok(false);
        }

        let query = format!(
            "INSERT INTO dispositions ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             ON CONFLICT (id) DO NOTHING"
        );
        sqlx::query(&query)
            .bind(d.id)
            .bind(d.letter_id)
            .bind(d.activity_id)
            .bind(d.assigned_to)
            .bind(&d.instruction_text)
            .bind(d.status.as_str())
            .bind(d.deadline)
            .bind(Json(&d.reports))
            .bind(Json(&d.attachments))
            .bind(&d.notes)
            .bind(d.created_by)
            .bind(d.created_at)
            .bind(d.updated_at)
            .bind(d.completed_at)
            .bind(d.completed_by)
            .bind(d.parent_disposition_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DispositionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dispositions WHERE id = $1");
        sqlx::query_as::<_, DispositionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Replace every mutable column. Returns `false` if the row is gone.
    pub async fn update(pool: &PgPool, d: &Disposition) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE dispositions SET \
                assigned_to = $2, instruction_text = $3, status = $4, deadline = $5, \
                reports = $6, attachments = $7, notes = $8, updated_at = $9, \
                completed_at = $10, completed_by = $11 \
             WHERE id = $1",
        )
        .bind(d.id)
        .bind(d.assigned_to)
        .bind(&d.instruction_text)
        .bind(d.status.as_str())
        .bind(d.deadline)
        .bind(Json(&d.reports))
        .bind(Json(&d.attachments))
        .bind(&d.notes)
        .bind(d.updated_at)
        .bind(d.completed_at)
        .bind(d.completed_by)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Hard delete through `delete_disposition`, which also clears the
    /// activity's link when the pair's last disposition goes. Returns `true`
    /// if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT delete_disposition($1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// All dispositions of a letter/activity pair, oldest first.
    pub async fn list_for_link(
        pool: &PgPool,
        letter_id: DbId,
        activity_id: DbId,
    ) -> Result<Vec<DispositionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dispositions \
             WHERE letter_id = $1 AND activity_id = $2 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, DispositionRow>(&query)
            .bind(letter_id)
            .bind(activity_id)
            .fetch_all(pool)
            .await
    }

    /// Dispositions currently held by a user, newest first.
    pub async fn list_assigned_to(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<DispositionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dispositions \
             WHERE assigned_to = $1 \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, DispositionRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Open dispositions whose deadline is on or before `until`.
    pub async fn list_due_by(pool: &PgPool, until: Date) -> Result<Vec<DispositionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dispositions \
             WHERE status IN ('pending', 'in_progress') \
               AND deadline IS NOT NULL AND deadline <= $1 \
             ORDER BY deadline ASC"
        );
        sqlx::query_as::<_, DispositionRow>(&query)
            .bind(until)
            .fetch_all(pool)
            .await
    }
}
