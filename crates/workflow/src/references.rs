//! Reference validation run before every write.
//!
//! Missing entities surface as [`CoreError::Reference`] so callers can say
//! "User not found" instead of "invalid input".

use std::sync::Arc;

use surat_core::error::CoreError;
use surat_core::ports::ReferenceStore;
use surat_core::retry::{with_retry, RetryPolicy};
use surat_core::types::DbId;

pub const ENTITY_LETTER: &str = "Letter";
pub const ENTITY_ACTIVITY: &str = "Activity";
pub const ENTITY_USER: &str = "User";

#[derive(Clone)]
pub struct ReferenceValidator {
    store: Arc<dyn ReferenceStore>,
    retry: RetryPolicy,
}

impl ReferenceValidator {
    pub fn new(store: Arc<dyn ReferenceStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub async fn require_letter(&self, id: DbId) -> Result<(), CoreError> {
        let exists = with_retry(&self.retry, "letter_exists", || self.store.letter_exists(id)).await?;
        if exists {
            Ok(())
        } else {
            Err(CoreError::missing(ENTITY_LETTER, id))
        }
    }

    pub async fn require_activity(&self, id: DbId) -> Result<(), CoreError> {
        let exists =
            with_retry(&self.retry, "activity_exists", || self.store.activity_exists(id)).await?;
        if exists {
            Ok(())
        } else {
            Err(CoreError::missing(ENTITY_ACTIVITY, id))
        }
    }

    pub async fn require_user(&self, id: DbId) -> Result<(), CoreError> {
        self.require_users(&[id]).await
    }

    /// Fails with every missing id at once.
    pub async fn require_users(&self, ids: &[DbId]) -> Result<(), CoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let missing =
            with_retry(&self.retry, "missing_users", || self.store.missing_users(ids)).await?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Reference {
                entity: ENTITY_USER,
                ids: missing,
            })
        }
    }

    /// Check both ends of a letter/activity pair.
    pub async fn require_pair(&self, letter_id: DbId, activity_id: DbId) -> Result<(), CoreError> {
        self.require_letter(letter_id).await?;
        self.require_activity(activity_id).await
    }
}
