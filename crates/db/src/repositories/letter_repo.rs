//! Repository for the `letters` table.

use sqlx::PgPool;
use surat_core::types::DbId;

use crate::models::letter::{CreateLetter, Letter};

const COLUMNS: &str = "id, letter_number, subject, sender, letter_date, direction, created_at";

pub struct LetterRepo;

impl LetterRepo {
    pub async fn create(pool: &PgPool, input: &CreateLetter) -> Result<Letter, sqlx::Error> {
        let query = format!(
            "INSERT INTO letters (letter_number, subject, sender, letter_date, direction) \
             VALUES ($1, $2, $3, $4, COALESCE($5, 'incoming')) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Letter>(&query)
            .bind(&input.letter_number)
            .bind(&input.subject)
            .bind(&input.sender)
            .bind(input.letter_date)
            .bind(&input.direction)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Letter>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM letters WHERE id = $1");
        sqlx::query_as::<_, Letter>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM letters WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
