//! Disposition domain types and the pure rules around them.
//!
//! The status machine has no enforced ordering: any status may move to any
//! other. The only gate is that `Completed` needs at least one report.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::{Date, DbId, Timestamp};

/// History value written for an unset deadline.
pub const NO_DEADLINE: &str = "No deadline";

/// History `new_value` written when a disposition is deleted outright.
pub const DELETED_MARKER: &str = "deleted";

/// History `new_value` written when a disposition is removed by unlinking.
pub const UNLINKED_MARKER: &str = "unlinked";

/// Maximum length of an instruction text, in characters.
pub const MAX_INSTRUCTION_LEN: usize = 5_000;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl DispositionStatus {
    pub const ALL: [DispositionStatus; 4] = [
        DispositionStatus::Pending,
        DispositionStatus::InProgress,
        DispositionStatus::Completed,
        DispositionStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DispositionStatus::Pending => "pending",
            DispositionStatus::InProgress => "in_progress",
            DispositionStatus::Completed => "completed",
            DispositionStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled dispositions no longer receive reminders.
    pub fn is_terminal(self) -> bool {
        matches!(self, DispositionStatus::Completed | DispositionStatus::Cancelled)
    }
}

impl fmt::Display for DispositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispositionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "pending" => Ok(DispositionStatus::Pending),
            "in_progress" | "inprogress" => Ok(DispositionStatus::InProgress),
            "completed" => Ok(DispositionStatus::Completed),
            "cancelled" | "canceled" => Ok(DispositionStatus::Cancelled),
            _ => Err(CoreError::Validation(format!(
                "Invalid status '{s}'. Must be one of: pending, in_progress, completed, cancelled"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// History action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    StatusChanged,
    AssigneeAdded,
    AssigneeRemoved,
    Reassigned,
    TextUpdated,
    LaporanUploaded,
    LaporanDeleted,
    NotesUpdated,
    DeadlineChanged,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::Created => "created",
            HistoryAction::StatusChanged => "status_changed",
            HistoryAction::AssigneeAdded => "assignee_added",
            HistoryAction::AssigneeRemoved => "assignee_removed",
            HistoryAction::Reassigned => "reassigned",
            HistoryAction::TextUpdated => "text_updated",
            HistoryAction::LaporanUploaded => "laporan_uploaded",
            HistoryAction::LaporanDeleted => "laporan_deleted",
            HistoryAction::NotesUpdated => "notes_updated",
            HistoryAction::DeadlineChanged => "deadline_changed",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(HistoryAction::Created),
            "status_changed" => Ok(HistoryAction::StatusChanged),
            "assignee_added" => Ok(HistoryAction::AssigneeAdded),
            "assignee_removed" => Ok(HistoryAction::AssigneeRemoved),
            "reassigned" => Ok(HistoryAction::Reassigned),
            "text_updated" => Ok(HistoryAction::TextUpdated),
            "laporan_uploaded" => Ok(HistoryAction::LaporanUploaded),
            "laporan_deleted" => Ok(HistoryAction::LaporanDeleted),
            "notes_updated" => Ok(HistoryAction::NotesUpdated),
            "deadline_changed" => Ok(HistoryAction::DeadlineChanged),
            other => Err(CoreError::Validation(format!(
                "Unknown history action '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// A file or link embedded in a disposition's `reports` or `attachments`.
///
/// Owned by exactly one disposition. `storage_path` is empty for links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: DbId,
    pub name: String,
    pub byte_size: i64,
    pub mime_type: String,
    #[serde(default)]
    pub storage_path: String,
    pub url: String,
    #[serde(default)]
    pub is_link: bool,
}

impl Attachment {
    /// An external link with no stored blob.
    pub fn link(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            byte_size: 0,
            mime_type: "text/uri-list".to_string(),
            storage_path: String::new(),
            url: url.into(),
            is_link: true,
        }
    }

    /// A file stored in the object store at `storage_path`.
    pub fn stored(
        name: impl Into<String>,
        byte_size: i64,
        mime_type: impl Into<String>,
        storage_path: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            byte_size,
            mime_type: mime_type.into(),
            storage_path: storage_path.into(),
            url: url.into(),
            is_link: false,
        }
    }

    /// Whether removing this attachment must also remove a blob.
    pub fn has_blob(&self) -> bool {
        !self.is_link && !self.storage_path.is_empty()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("Attachment name must not be empty".into()));
        }
        if self.is_link && self.url.trim().is_empty() {
            return Err(CoreError::Validation("Link attachments require a url".into()));
        }
        if !self.is_link && self.storage_path.trim().is_empty() {
            return Err(CoreError::Validation(
                "File attachments require a storage path".into(),
            ));
        }
        if self.byte_size < 0 {
            return Err(CoreError::Validation("Attachment size must not be negative".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Disposition
// ---------------------------------------------------------------------------

/// A single-assignee unit of routed work for one letter/activity pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disposition {
    pub id: DbId,
    pub letter_id: DbId,
    pub activity_id: DbId,
    pub assigned_to: DbId,
    pub instruction_text: String,
    pub status: DispositionStatus,
    pub deadline: Option<Date>,
    pub reports: Vec<Attachment>,
    pub attachments: Vec<Attachment>,
    pub notes: Option<String>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub completed_by: Option<DbId>,
    pub parent_disposition_id: Option<DbId>,
}

/// Everything needed to insert one pending disposition.
#[derive(Debug, Clone)]
pub struct NewDisposition {
    pub letter_id: DbId,
    pub activity_id: DbId,
    pub assigned_to: DbId,
    pub instruction_text: String,
    pub deadline: Option<Date>,
    pub attachments: Vec<Attachment>,
    pub created_by: DbId,
}

impl NewDisposition {
    /// Materialize the row with a fresh id and `Pending` status.
    pub fn into_pending(self, now: Timestamp) -> Disposition {
        Disposition {
            id: Uuid::new_v4(),
            letter_id: self.letter_id,
            activity_id: self.activity_id,
            assigned_to: self.assigned_to,
            instruction_text: self.instruction_text,
            status: DispositionStatus::Pending,
            deadline: self.deadline,
            reports: Vec::new(),
            attachments: self.attachments,
            notes: None,
            created_by: self.created_by,
            created_at: now,
            updated_at: None,
            completed_at: None,
            completed_by: None,
            parent_disposition_id: None,
        }
    }
}

impl Disposition {
    /// Move to `next`, stamping completion when entering `Completed`.
    ///
    /// Leaving `Completed` keeps `completed_at`/`completed_by` as the record
    /// of the last completion.
    pub fn apply_status(
        &mut self,
        next: DispositionStatus,
        actor_id: DbId,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        validate_completion(next, &self.reports)?;
        if next == DispositionStatus::Completed && self.status != DispositionStatus::Completed {
            self.completed_at = Some(now);
            self.completed_by = Some(actor_id);
        }
        self.status = next;
        self.updated_at = Some(now);
        Ok(())
    }

    /// Object-store paths of every stored report and attachment.
    pub fn blob_paths(&self) -> Vec<String> {
        self.reports
            .iter()
            .chain(self.attachments.iter())
            .filter(|a| a.has_blob())
            .map(|a| a.storage_path.clone())
            .collect()
    }

    pub fn find_report(&self, attachment_id: DbId) -> Option<&Attachment> {
        self.reports.iter().find(|r| r.id == attachment_id)
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// An immutable audit record of one field-level change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: DbId,
    pub disposition_id: DbId,
    pub action: HistoryAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub performed_by: DbId,
    pub performed_at: Timestamp,
}

/// A history entry before the recorder stamps its id and time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub disposition_id: DbId,
    pub action: HistoryAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub performed_by: DbId,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Trim and check an instruction text.
pub fn validate_instruction_text(text: &str) -> Result<String, CoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Instruction text must not be empty".into(),
        ));
    }
    if trimmed.chars().count() > MAX_INSTRUCTION_LEN {
        return Err(CoreError::Validation(format!(
            "Instruction text must be at most {MAX_INSTRUCTION_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Reject an empty assignee list and drop duplicates, keeping first
/// occurrence order.
pub fn validate_assignees(assignees: &[DbId]) -> Result<Vec<DbId>, CoreError> {
    if assignees.is_empty() {
        return Err(CoreError::Validation(
            "At least one assignee is required".into(),
        ));
    }
    let mut unique = Vec::with_capacity(assignees.len());
    for id in assignees {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    Ok(unique)
}

/// Delegation hands a disposition to exactly one new user.
pub fn single_delegate_target(assignees: &[DbId]) -> Result<DbId, CoreError> {
    match assignees {
        [only] => Ok(*only),
        [] => Err(CoreError::Validation(
            "Delegation requires a new assignee".into(),
        )),
        _ => Err(CoreError::Validation(
            "Delegation targets exactly one assignee; create new dispositions to assign several users"
                .into(),
        )),
    }
}

/// `Completed` requires at least one report.
pub fn validate_completion(
    next: DispositionStatus,
    reports: &[Attachment],
) -> Result<(), CoreError> {
    if next == DispositionStatus::Completed && reports.is_empty() {
        return Err(CoreError::Validation(
            "A report must be uploaded before the disposition can be completed".into(),
        ));
    }
    Ok(())
}

/// Empty or whitespace-only notes clear the field.
pub fn normalize_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// History representation of a deadline.
pub fn deadline_label(deadline: Option<Date>) -> String {
    match deadline {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => NO_DEADLINE.to_string(),
    }
}
