//! Async ports implemented by the persistence and delivery layers.
//!
//! The workflow services only see these traits, so they run unchanged
//! against PostgreSQL in production and in-memory fakes in tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::disposition::{Attachment, Disposition, HistoryEntry};
use crate::error::CoreError;
use crate::notifications::NotificationRequest;
use crate::types::{Date, DbId, Timestamp};

/// Row-level persistence for dispositions. Updates replace the whole row,
/// so concurrent edits are last-write-wins.
#[async_trait]
pub trait DispositionStore: Send + Sync {
    /// Add a disposition to an existing link. Fails with `Conflict` when the
    /// activity is not linked to the disposition's letter. Inserting a row
    /// whose id is already stored is a no-op, so retries are safe.
    async fn insert(&self, disposition: &Disposition) -> Result<(), CoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<Disposition>, CoreError>;

    /// Returns `false` when the row no longer exists.
    async fn update(&self, disposition: &Disposition) -> Result<bool, CoreError>;

    /// Hard delete. Returns `false` when the row did not exist. Removing the
    /// last disposition of a linked pair clears the activity's link in the
    /// same transaction.
    async fn delete(&self, id: DbId) -> Result<bool, CoreError>;

    async fn list_for_link(
        &self,
        letter_id: DbId,
        activity_id: DbId,
    ) -> Result<Vec<Disposition>, CoreError>;

    async fn list_assigned_to(&self, user_id: DbId) -> Result<Vec<Disposition>, CoreError>;

    /// Non-terminal dispositions with a deadline on or before `until`.
    async fn list_due_by(&self, until: Date) -> Result<Vec<Disposition>, CoreError>;
}

/// Append-only sink for history entries.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), CoreError>;

    /// Entries for a disposition, newest first.
    async fn list_for_disposition(&self, disposition_id: DbId)
        -> Result<Vec<HistoryEntry>, CoreError>;
}

/// Existence checks against the `letters`, `activities` and `users` tables.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn letter_exists(&self, id: DbId) -> Result<bool, CoreError>;

    async fn activity_exists(&self, id: DbId) -> Result<bool, CoreError>;

    /// Ids from `ids` that have no matching user, in input order.
    async fn missing_users(&self, ids: &[DbId]) -> Result<Vec<DbId>, CoreError>;
}

/// Payload handed to the atomic link procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPayload {
    pub assignees: Vec<DbId>,
    pub instruction_text: String,
    pub deadline: Option<Date>,
    pub attachments: Vec<Attachment>,
    pub created_by: DbId,
    pub created_at: Timestamp,
}

/// The store's atomic link/unlink procedures.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Mark the activity as linked and insert one pending disposition per
    /// assignee, all or nothing. Returns the new ids in assignee order.
    /// Replaying a payload that already committed returns the same ids.
    async fn link_letter_to_activity(
        &self,
        letter_id: DbId,
        activity_id: DbId,
        payload: &LinkPayload,
    ) -> Result<Vec<DbId>, CoreError>;

    /// Clear the activity's link and delete every disposition of the pair,
    /// all or nothing. Succeeds without writing when the activity is already
    /// unlinked; fails with `Conflict` when it is linked to another letter.
    async fn unlink_letter_from_activity(
        &self,
        letter_id: DbId,
        activity_id: DbId,
    ) -> Result<(), CoreError>;

    /// The letter an activity is currently linked to, if any.
    async fn linked_letter(&self, activity_id: DbId) -> Result<Option<DbId>, CoreError>;

    /// Copy descriptive letter fields onto the activity. Idempotent.
    async fn copy_letter_metadata(&self, letter_id: DbId, activity_id: DbId)
        -> Result<(), CoreError>;
}

/// Blob storage for report files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `path`, returning the public URL.
    async fn upload(&self, path: &str, bytes: &[u8], mime_type: &str) -> Result<String, CoreError>;

    async fn remove(&self, paths: &[String]) -> Result<(), CoreError>;

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, CoreError>;
}

/// Outbound notification channel. Callers treat every failure as
/// non-fatal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, request: NotificationRequest) -> Result<(), CoreError>;
}
