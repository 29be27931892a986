//! Repository for the `activities` table.

use sqlx::PgPool;
use surat_core::types::DbId;

use crate::models::activity::{Activity, CreateActivity};

const COLUMNS: &str = "\
    id, title, description, scheduled_at, linked_letter_id, \
    letter_number, letter_subject, letter_sender, created_at, updated_at";

pub struct ActivityRepo;

impl ActivityRepo {
    pub async fn create(pool: &PgPool, input: &CreateActivity) -> Result<Activity, sqlx::Error> {
        let query = format!(
            "INSERT INTO activities (title, description, scheduled_at) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Activity>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.scheduled_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Activity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM activities WHERE id = $1");
        sqlx::query_as::<_, Activity>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM activities WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    pub async fn title(pool: &PgPool, id: DbId) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT title FROM activities WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The letter the activity is linked to. `None` both when unlinked and
    /// when the activity does not exist.
    pub async fn linked_letter(pool: &PgPool, id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<DbId>>(
            "SELECT linked_letter_id FROM activities WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map(Option::flatten)
    }

    /// Copy the letter's number, subject and sender onto the activity.
    ///
    /// Returns `false` if either row is missing. Repeating the copy is
    /// harmless.
    pub async fn copy_letter_metadata(
        pool: &PgPool,
        letter_id: DbId,
        activity_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE activities a SET \
                letter_number = l.letter_number, \
                letter_subject = l.subject, \
                letter_sender = l.sender, \
                updated_at = NOW() \
             FROM letters l \
             WHERE a.id = $2 AND l.id = $1",
        )
        .bind(letter_id)
        .bind(activity_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
