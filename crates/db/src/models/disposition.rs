//! Disposition row and its conversion to the domain type.

use sqlx::types::Json;
use sqlx::FromRow;
use surat_core::disposition::{Attachment, Disposition};
use surat_core::error::CoreError;
use surat_core::types::{Date, DbId, Timestamp};

/// A row from the `dispositions` table.
#[derive(Debug, Clone, FromRow)]
pub struct DispositionRow {
    pub id: DbId,
    pub letter_id: DbId,
    pub activity_id: DbId,
    pub assigned_to: DbId,
    pub instruction_text: String,
    pub status: String,
    pub deadline: Option<Date>,
    pub reports: Json<Vec<Attachment>>,
    pub attachments: Json<Vec<Attachment>>,
    pub notes: Option<String>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub completed_by: Option<DbId>,
    pub parent_disposition_id: Option<DbId>,
}

impl TryFrom<DispositionRow> for Disposition {
    type Error = CoreError;

    fn try_from(row: DispositionRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| CoreError::Database {
            message: format!("Unknown disposition status '{}' in row {}", row.status, row.id),
            transient: false,
        })?;
        Ok(Disposition {
            id: row.id,
            letter_id: row.letter_id,
            activity_id: row.activity_id,
            assigned_to: row.assigned_to,
            instruction_text: row.instruction_text,
            status,
            deadline: row.deadline,
            reports: row.reports.0,
            attachments: row.attachments.0,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
            completed_by: row.completed_by,
            parent_disposition_id: row.parent_disposition_id,
        })
    }
}

/// Convert a batch of rows, failing on the first malformed one.
pub fn into_dispositions(rows: Vec<DispositionRow>) -> Result<Vec<Disposition>, CoreError> {
    rows.into_iter().map(Disposition::try_from).collect()
}
