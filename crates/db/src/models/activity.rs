use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use surat_core::types::{DbId, Timestamp};

/// A row from the `activities` table.
///
/// The `letter_*` columns are a copy of the linked letter's fields, written
/// by the metadata copy after linking.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Activity {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: Option<Timestamp>,
    pub linked_letter_id: Option<DbId>,
    pub letter_number: Option<String>,
    pub letter_subject: Option<String>,
    pub letter_sender: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

/// DTO for inserting an activity.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateActivity {
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: Option<Timestamp>,
}
