use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use surat_core::types::{Date, DbId, Timestamp};

/// A row from the `letters` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Letter {
    pub id: DbId,
    pub letter_number: String,
    pub subject: String,
    pub sender: Option<String>,
    pub letter_date: Option<Date>,
    pub direction: String,
    pub created_at: Timestamp,
}

/// DTO for inserting a letter.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLetter {
    pub letter_number: String,
    pub subject: String,
    pub sender: Option<String>,
    pub letter_date: Option<Date>,
    /// `incoming` when omitted.
    pub direction: Option<String>,
}
