//! PostgreSQL implementations of the workflow store ports.

use async_trait::async_trait;
use serde_json::json;
use surat_core::disposition::{Disposition, HistoryEntry};
use surat_core::error::CoreError;
use surat_core::ports::{DispositionStore, HistoryStore, LinkPayload, LinkStore, ReferenceStore};
use surat_core::types::{Date, DbId};

use crate::error::{classify, foreign_key_constraint};
use crate::models::disposition::into_dispositions;
use crate::repositories::{
    ActivityRepo, DispositionHistoryRepo, DispositionRepo, LetterRepo, LinkRepo, UserRepo,
};
use crate::DbPool;

/// Every database-backed port over one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Name the missing entity when an insert trips a foreign key.
fn insert_error(err: sqlx::Error, d: &Disposition) -> CoreError {
    match foreign_key_constraint(&err).as_deref() {
        Some(c) if c.contains("assigned_to") => CoreError::missing("User", d.assigned_to),
        Some(c) if c.contains("created_by") => CoreError::missing("User", d.created_by),
        Some(c) if c.contains("letter_id") => CoreError::missing("Letter", d.letter_id),
        Some(c) if c.contains("activity_id") => CoreError::missing("Activity", d.activity_id),
        _ => classify(err),
    }
}

fn not_linked(letter_id: DbId, activity_id: DbId) -> CoreError {
    CoreError::Conflict(format!(
        "Letter {letter_id} is not linked to activity {activity_id}"
    ))
}

#[async_trait]
impl DispositionStore for PgStore {
    async fn insert(&self, disposition: &Disposition) -> Result<(), CoreError> {
        let inserted = DispositionRepo::insert(&self.pool, disposition)
            .await
            .map_err(|e| insert_error(e, disposition))?;
        if inserted {
            Ok(())
        } else {
            Err(not_linked(disposition.letter_id, disposition.activity_id))
        }
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Disposition>, CoreError> {
        DispositionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify)?
            .map(Disposition::try_from)
            .transpose()
    }

    async fn update(&self, disposition: &Disposition) -> Result<bool, CoreError> {
        DispositionRepo::update(&self.pool, disposition)
            .await
            .map_err(|e| insert_error(e, disposition))
    }

    async fn delete(&self, id: DbId) -> Result<bool, CoreError> {
        DispositionRepo::delete(&self.pool, id).await.map_err(classify)
    }

    async fn list_for_link(
        &self,
        letter_id: DbId,
        activity_id: DbId,
    ) -> Result<Vec<Disposition>, CoreError> {
        let rows = DispositionRepo::list_for_link(&self.pool, letter_id, activity_id)
            .await
            .map_err(classify)?;
        into_dispositions(rows)
    }

    async fn list_assigned_to(&self, user_id: DbId) -> Result<Vec<Disposition>, CoreError> {
        let rows = DispositionRepo::list_assigned_to(&self.pool, user_id)
            .await
            .map_err(classify)?;
        into_dispositions(rows)
    }

    async fn list_due_by(&self, until: Date) -> Result<Vec<Disposition>, CoreError> {
        let rows = DispositionRepo::list_due_by(&self.pool, until)
            .await
            .map_err(classify)?;
        into_dispositions(rows)
    }
}

#[async_trait]
impl HistoryStore for PgStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), CoreError> {
        DispositionHistoryRepo::append(&self.pool, entry)
            .await
            .map_err(classify)
    }

    async fn list_for_disposition(
        &self,
        disposition_id: DbId,
    ) -> Result<Vec<HistoryEntry>, CoreError> {
        DispositionHistoryRepo::list_for_disposition(&self.pool, disposition_id)
            .await
            .map_err(classify)?
            .into_iter()
            .map(HistoryEntry::try_from)
            .collect()
    }
}

#[async_trait]
impl ReferenceStore for PgStore {
    async fn letter_exists(&self, id: DbId) -> Result<bool, CoreError> {
        LetterRepo::exists(&self.pool, id).await.map_err(classify)
    }

    async fn activity_exists(&self, id: DbId) -> Result<bool, CoreError> {
        ActivityRepo::exists(&self.pool, id).await.map_err(classify)
    }

    async fn missing_users(&self, ids: &[DbId]) -> Result<Vec<DbId>, CoreError> {
        UserRepo::missing(&self.pool, ids).await.map_err(classify)
    }
}

#[async_trait]
impl LinkStore for PgStore {
    async fn link_letter_to_activity(
        &self,
        letter_id: DbId,
        activity_id: DbId,
        payload: &LinkPayload,
    ) -> Result<Vec<DbId>, CoreError> {
        let body = json!({
            "assignees": payload.assignees,
            "instruction_text": payload.instruction_text,
            "deadline": payload.deadline,
            "attachments": payload.attachments,
            "created_by": payload.created_by,
            "created_at": payload.created_at,
        });
        LinkRepo::link(&self.pool, letter_id, activity_id, &body)
            .await
            .map_err(classify)
    }

    async fn unlink_letter_from_activity(
        &self,
        letter_id: DbId,
        activity_id: DbId,
    ) -> Result<(), CoreError> {
        LinkRepo::unlink(&self.pool, letter_id, activity_id)
            .await
            .map_err(classify)
    }

    async fn linked_letter(&self, activity_id: DbId) -> Result<Option<DbId>, CoreError> {
        ActivityRepo::linked_letter(&self.pool, activity_id)
            .await
            .map_err(classify)
    }

    async fn copy_letter_metadata(
        &self,
        letter_id: DbId,
        activity_id: DbId,
    ) -> Result<(), CoreError> {
        let copied = ActivityRepo::copy_letter_metadata(&self.pool, letter_id, activity_id)
            .await
            .map_err(classify)?;
        if copied {
            Ok(())
        } else {
            Err(CoreError::Reference {
                entity: "Activity",
                ids: vec![activity_id],
            })
        }
    }
}
