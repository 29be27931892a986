//! Disposition lifecycle: creation, status, edits, delegation, reports and
//! deletion.
//!
//! Every mutating call follows the same shape: load the row, authorize the
//! actor against it, validate, persist (with bounded retry on transient store
//! errors), record history, then run post-commit notifications.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use surat_core::authorization;
use surat_core::disposition::{
    deadline_label, normalize_notes, validate_assignees, validate_instruction_text, Attachment,
    Disposition, DispositionStatus, HistoryAction, HistoryEntry, NewDisposition, DELETED_MARKER,
};
use surat_core::error::CoreError;
use surat_core::notifications::NotificationRequest;
use surat_core::ports::{DispositionStore, LinkStore, Notifier, ObjectStore};
use surat_core::retry::{with_retry, RetryPolicy};
use surat_core::roles::Actor;
use surat_core::storage::{report_path, validate_upload};
use surat_core::types::{Date, DbId};
use uuid::Uuid;

use crate::audit::AuditRecorder;
use crate::hooks::PostCommit;
use crate::references::ReferenceValidator;
use crate::{Ports, WorkflowConfig};

pub const ENTITY_DISPOSITION: &str = "Disposition";
pub const ENTITY_REPORT: &str = "Report";

/// Input for fanning out one disposition per assignee.
#[derive(Debug, Clone)]
pub struct CreateDispositions {
    pub letter_id: DbId,
    pub activity_id: DbId,
    pub assignees: Vec<DbId>,
    pub instruction_text: String,
    pub deadline: Option<Date>,
    /// Supporting links shared by every created disposition.
    pub attachments: Vec<Attachment>,
    pub created_by: DbId,
}

/// An assignee for whom no disposition was created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedAssignee {
    pub user_id: DbId,
    pub reason: String,
}

/// Partial-success result of [`DispositionManager::create`].
#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    pub created: Vec<Disposition>,
    pub failed: Vec<FailedAssignee>,
}

impl CreateOutcome {
    pub fn failed_ids(&self) -> Vec<DbId> {
        self.failed.iter().map(|f| f.user_id).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Delegation {
    pub new_assignee: DbId,
    pub instruction_text: String,
    /// The deadline after delegation; `None` clears it.
    pub deadline: Option<Date>,
    /// Replaces the notes when set.
    pub notes: Option<String>,
}

/// A report file received from a client.
#[derive(Debug, Clone)]
pub struct ReportUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Reports and supporting attachments attached at creation time must be
/// links; uploaded files belong to exactly one disposition and are added
/// afterwards.
pub(crate) fn validate_creation_attachments(attachments: &[Attachment]) -> Result<(), CoreError> {
    for attachment in attachments {
        attachment.validate()?;
        if attachment.has_blob() {
            return Err(CoreError::Validation(format!(
                "Attachment '{}' must be a link; upload files to a single disposition instead",
                attachment.name
            )));
        }
    }
    Ok(())
}

/// Give every disposition its own copy with fresh ids.
pub(crate) fn own_copies(attachments: &[Attachment]) -> Vec<Attachment> {
    attachments
        .iter()
        .map(|a| Attachment {
            id: Uuid::new_v4(),
            ..a.clone()
        })
        .collect()
}

#[derive(Clone)]
pub struct DispositionManager {
    store: Arc<dyn DispositionStore>,
    links: Arc<dyn LinkStore>,
    objects: Arc<dyn ObjectStore>,
    notifier: Arc<dyn Notifier>,
    references: ReferenceValidator,
    audit: AuditRecorder,
    config: WorkflowConfig,
}

impl DispositionManager {
    pub fn new(ports: &Ports, config: WorkflowConfig) -> Self {
        Self {
            store: Arc::clone(&ports.dispositions),
            links: Arc::clone(&ports.links),
            objects: Arc::clone(&ports.objects),
            notifier: Arc::clone(&ports.notifier),
            references: ReferenceValidator::new(Arc::clone(&ports.references), config.retry),
            audit: AuditRecorder::new(Arc::clone(&ports.history), config.retry),
            config,
        }
    }

    fn retry(&self) -> &RetryPolicy {
        &self.config.retry
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn get(&self, id: DbId) -> Result<Disposition, CoreError> {
        with_retry(self.retry(), "find_disposition", || self.store.find_by_id(id))
            .await?
            .ok_or(CoreError::NotFound {
                entity: ENTITY_DISPOSITION,
                id,
            })
    }

    pub async fn list_for_link(
        &self,
        letter_id: DbId,
        activity_id: DbId,
    ) -> Result<Vec<Disposition>, CoreError> {
        with_retry(self.retry(), "list_for_link", || {
            self.store.list_for_link(letter_id, activity_id)
        })
        .await
    }

    pub async fn list_assigned_to(&self, user_id: DbId) -> Result<Vec<Disposition>, CoreError> {
        with_retry(self.retry(), "list_assigned_to", || {
            self.store.list_assigned_to(user_id)
        })
        .await
    }

    /// History newest first. Still available after the disposition is
    /// deleted.
    pub async fn history(&self, id: DbId) -> Result<Vec<HistoryEntry>, CoreError> {
        self.audit.history(id).await
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Add one pending disposition per assignee to an existing link. Pairs
    /// that are not linked yet go through [`crate::LinkCoordinator::link`].
    ///
    /// Assignees are processed in order. When one fails validation or
    /// insertion, the ones before it stay committed and it and every later
    /// assignee are reported in [`CreateOutcome::failed`]. The call only
    /// errors when nothing was created.
    pub async fn create(
        &self,
        input: CreateDispositions,
        actor: &Actor,
    ) -> Result<CreateOutcome, CoreError> {
        authorization::require_create(actor)?;
        let instruction_text = validate_instruction_text(&input.instruction_text)?;
        let assignees = validate_assignees(&input.assignees)?;
        validate_creation_attachments(&input.attachments)?;
        self.references
            .require_pair(input.letter_id, input.activity_id)
            .await?;
        self.require_link(input.letter_id, input.activity_id).await?;

        let mut created = Vec::with_capacity(assignees.len());
        let mut failed = Vec::new();
        let mut first_error = None;

        for (index, assignee) in assignees.iter().copied().enumerate() {
            let new = NewDisposition {
                letter_id: input.letter_id,
                activity_id: input.activity_id,
                assigned_to: assignee,
                instruction_text: instruction_text.clone(),
                deadline: input.deadline,
                attachments: own_copies(&input.attachments),
                created_by: input.created_by,
            };
            match self.create_one(new, actor).await {
                Ok(disposition) => created.push(disposition),
                Err(e) => {
                    tracing::warn!(
                        letter_id = %input.letter_id,
                        activity_id = %input.activity_id,
                        assignee = %assignee,
                        skipped = assignees.len() - index - 1,
                        error = %e,
                        "Disposition creation stopped at failing assignee"
                    );
                    let reason = e.to_string();
                    failed.push(FailedAssignee {
                        user_id: assignee,
                        reason: reason.clone(),
                    });
                    failed.extend(assignees[index + 1..].iter().map(|&user_id| FailedAssignee {
                        user_id,
                        reason: format!("Skipped after failure for {assignee}: {reason}"),
                    }));
                    first_error = Some(e);
                    break;
                }
            }
        }

        if created.is_empty() {
            return Err(first_error.unwrap_or_else(|| {
                CoreError::Internal("No dispositions were created".into())
            }));
        }

        let mut hooks = PostCommit::new();
        for disposition in &created {
            hooks.notify_unless_actor(NotificationRequest::assigned(disposition), actor.user_id);
        }
        hooks.run(self.notifier.as_ref()).await;

        tracing::info!(
            letter_id = %input.letter_id,
            activity_id = %input.activity_id,
            created = created.len(),
            failed = failed.len(),
            user_id = %actor.user_id,
            "Dispositions created"
        );

        Ok(CreateOutcome { created, failed })
    }

    async fn require_link(&self, letter_id: DbId, activity_id: DbId) -> Result<(), CoreError> {
        let current = with_retry(self.retry(), "linked_letter", || {
            self.links.linked_letter(activity_id)
        })
        .await?;
        if current == Some(letter_id) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Letter {letter_id} is not linked to activity {activity_id}; link them first"
            )))
        }
    }

    async fn create_one(&self, new: NewDisposition, actor: &Actor) -> Result<Disposition, CoreError> {
        self.references.require_user(new.assigned_to).await?;
        let disposition = new.into_pending(Utc::now());
        with_retry(self.retry(), "insert_disposition", || {
            self.store.insert(&disposition)
        })
        .await?;
        self.audit
            .change(
                disposition.id,
                HistoryAction::Created,
                None,
                Some(disposition.assigned_to.to_string()),
                actor.user_id,
            )
            .await;
        Ok(disposition)
    }

    // -----------------------------------------------------------------------
    // Field updates
    // -----------------------------------------------------------------------

    /// Change the status. Entering `Completed` requires at least one report
    /// and stamps `completed_at`/`completed_by`; leaving it keeps them.
    pub async fn update_status(
        &self,
        id: DbId,
        status: DispositionStatus,
        actor: &Actor,
    ) -> Result<Disposition, CoreError> {
        let mut disposition = self.get(id).await?;
        authorization::require_update(actor, disposition.assigned_to, disposition.created_by)?;

        let old = disposition.status;
        if old == status {
            return Ok(disposition);
        }
        disposition.apply_status(status, actor.user_id, Utc::now())?;
        self.persist(&disposition).await?;

        self.audit
            .change(
                id,
                HistoryAction::StatusChanged,
                Some(old.as_str().to_string()),
                Some(status.as_str().to_string()),
                actor.user_id,
            )
            .await;

        let mut hooks = PostCommit::new();
        hooks.notify_unless_actor(NotificationRequest::status_changed(&disposition, old), actor.user_id);
        if status == DispositionStatus::Completed {
            hooks.notify_unless_actor(NotificationRequest::completed(&disposition), actor.user_id);
        }
        hooks.run(self.notifier.as_ref()).await;

        tracing::info!(
            disposition_id = %id,
            from = %old,
            to = %status,
            user_id = %actor.user_id,
            "Disposition status changed"
        );
        Ok(disposition)
    }

    /// Replace the notes. Blank notes clear the field.
    pub async fn update_notes(
        &self,
        id: DbId,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<Disposition, CoreError> {
        let mut disposition = self.get(id).await?;
        authorization::require_update(actor, disposition.assigned_to, disposition.created_by)?;

        let notes = normalize_notes(notes.as_deref());
        if disposition.notes == notes {
            return Ok(disposition);
        }
        let old = std::mem::replace(&mut disposition.notes, notes.clone());
        disposition.updated_at = Some(Utc::now());
        self.persist(&disposition).await?;

        self.audit
            .change(id, HistoryAction::NotesUpdated, old, notes, actor.user_id)
            .await;
        Ok(disposition)
    }

    /// Set or clear the deadline. History records an unset deadline as
    /// `"No deadline"`.
    pub async fn update_deadline(
        &self,
        id: DbId,
        deadline: Option<Date>,
        actor: &Actor,
    ) -> Result<Disposition, CoreError> {
        let mut disposition = self.get(id).await?;
        authorization::require_update(actor, disposition.assigned_to, disposition.created_by)?;

        if disposition.deadline == deadline {
            return Ok(disposition);
        }
        let old = std::mem::replace(&mut disposition.deadline, deadline);
        disposition.updated_at = Some(Utc::now());
        self.persist(&disposition).await?;

        self.audit
            .change(
                id,
                HistoryAction::DeadlineChanged,
                Some(deadline_label(old)),
                Some(deadline_label(deadline)),
                actor.user_id,
            )
            .await;
        Ok(disposition)
    }

    pub async fn update_instruction_text(
        &self,
        id: DbId,
        text: &str,
        actor: &Actor,
    ) -> Result<Disposition, CoreError> {
        let mut disposition = self.get(id).await?;
        authorization::require_update(actor, disposition.assigned_to, disposition.created_by)?;

        let text = validate_instruction_text(text)?;
        if disposition.instruction_text == text {
            return Ok(disposition);
        }
        let old = std::mem::replace(&mut disposition.instruction_text, text.clone());
        disposition.updated_at = Some(Utc::now());
        self.persist(&disposition).await?;

        self.audit
            .change(id, HistoryAction::TextUpdated, Some(old), Some(text), actor.user_id)
            .await;
        Ok(disposition)
    }

    // -----------------------------------------------------------------------
    // Delegation
    // -----------------------------------------------------------------------

    /// Hand the disposition to a single new assignee, in place.
    ///
    /// No new row is created; the previous assignee, text and deadline
    /// survive only in history, written as reassignment, then text change,
    /// then deadline change.
    pub async fn delegate(
        &self,
        id: DbId,
        delegation: Delegation,
        actor: &Actor,
    ) -> Result<Disposition, CoreError> {
        let mut disposition = self.get(id).await?;
        authorization::require_delegate(actor, disposition.assigned_to)?;

        let text = validate_instruction_text(&delegation.instruction_text)?;
        if delegation.new_assignee == disposition.assigned_to {
            return Err(CoreError::Validation(
                "Disposition is already assigned to this user".into(),
            ));
        }
        self.references.require_user(delegation.new_assignee).await?;

        let previous = disposition.clone();
        disposition.assigned_to = delegation.new_assignee;
        disposition.instruction_text = text;
        disposition.deadline = delegation.deadline;
        if delegation.notes.is_some() {
            disposition.notes = normalize_notes(delegation.notes.as_deref());
        }
        disposition.updated_at = Some(Utc::now());
        self.persist(&disposition).await?;

        self.audit
            .change(
                id,
                HistoryAction::Reassigned,
                Some(previous.assigned_to.to_string()),
                Some(disposition.assigned_to.to_string()),
                actor.user_id,
            )
            .await;
        if previous.instruction_text != disposition.instruction_text {
            self.audit
                .change(
                    id,
                    HistoryAction::TextUpdated,
                    Some(previous.instruction_text.clone()),
                    Some(disposition.instruction_text.clone()),
                    actor.user_id,
                )
                .await;
        }
        if previous.deadline != disposition.deadline {
            self.audit
                .change(
                    id,
                    HistoryAction::DeadlineChanged,
                    Some(deadline_label(previous.deadline)),
                    Some(deadline_label(disposition.deadline)),
                    actor.user_id,
                )
                .await;
        }

        let mut hooks = PostCommit::new();
        hooks.notify_unless_actor(NotificationRequest::delegated(&disposition), actor.user_id);
        hooks.run(self.notifier.as_ref()).await;

        tracing::info!(
            disposition_id = %id,
            from = %previous.assigned_to,
            to = %disposition.assigned_to,
            user_id = %actor.user_id,
            "Disposition delegated"
        );
        Ok(disposition)
    }

    // -----------------------------------------------------------------------
    // Reports
    // -----------------------------------------------------------------------

    /// Append an already stored (or link) report.
    pub async fn attach_report(
        &self,
        id: DbId,
        report: Attachment,
        actor: &Actor,
    ) -> Result<Disposition, CoreError> {
        let disposition = self.get(id).await?;
        authorization::require_update(actor, disposition.assigned_to, disposition.created_by)?;
        report.validate()?;
        self.attach_loaded(disposition, report, actor).await
    }

    /// Store a report file, then attach it. If the upload or the attach
    /// fails, whatever reached the object store is removed again.
    pub async fn upload_report(
        &self,
        id: DbId,
        upload: ReportUpload,
        actor: &Actor,
    ) -> Result<Disposition, CoreError> {
        let disposition = self.get(id).await?;
        authorization::require_update(actor, disposition.assigned_to, disposition.created_by)?;
        validate_upload(&upload.file_name, &upload.bytes)?;

        let path = report_path(id, Uuid::new_v4(), &upload.file_name);
        let url = match self
            .objects
            .upload(&path, &upload.bytes, &upload.mime_type)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                // The write may have landed partially.
                self.remove_blobs(id, std::slice::from_ref(&path)).await;
                return Err(match e {
                    CoreError::FileUpload(_) => e,
                    other => CoreError::FileUpload(other.to_string()),
                });
            }
        };

        let report = Attachment::stored(
            upload.file_name.trim(),
            upload.bytes.len() as i64,
            upload.mime_type,
            path.clone(),
            url,
        );

        match self.attach_loaded(disposition, report, actor).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                self.remove_blobs(id, &[path]).await;
                Err(e)
            }
        }
    }

    async fn attach_loaded(
        &self,
        mut disposition: Disposition,
        report: Attachment,
        actor: &Actor,
    ) -> Result<Disposition, CoreError> {
        let name = report.name.clone();
        disposition.reports.push(report);
        disposition.updated_at = Some(Utc::now());
        self.persist(&disposition).await?;

        self.audit
            .change(
                disposition.id,
                HistoryAction::LaporanUploaded,
                None,
                Some(name),
                actor.user_id,
            )
            .await;
        Ok(disposition)
    }

    /// Remove a report from the list, then delete its blob best-effort.
    pub async fn remove_report(
        &self,
        id: DbId,
        attachment_id: DbId,
        actor: &Actor,
    ) -> Result<Disposition, CoreError> {
        let mut disposition = self.get(id).await?;
        authorization::require_update(actor, disposition.assigned_to, disposition.created_by)?;

        let position = disposition
            .reports
            .iter()
            .position(|r| r.id == attachment_id)
            .ok_or(CoreError::NotFound {
                entity: ENTITY_REPORT,
                id: attachment_id,
            })?;
        let removed = disposition.reports.remove(position);
        disposition.updated_at = Some(Utc::now());
        self.persist(&disposition).await?;

        self.audit
            .change(
                id,
                HistoryAction::LaporanDeleted,
                Some(removed.name.clone()),
                None,
                actor.user_id,
            )
            .await;

        if removed.has_blob() {
            self.remove_blobs(id, &[removed.storage_path]).await;
        }
        Ok(disposition)
    }

    /// URL for downloading a report: signed for stored files, verbatim for
    /// links.
    pub async fn report_url(
        &self,
        id: DbId,
        attachment_id: DbId,
        actor: &Actor,
    ) -> Result<String, CoreError> {
        let disposition = self.get(id).await?;
        authorization::require_update(actor, disposition.assigned_to, disposition.created_by)?;
        let report = disposition
            .find_report(attachment_id)
            .ok_or(CoreError::NotFound {
                entity: ENTITY_REPORT,
                id: attachment_id,
            })?;
        if report.has_blob() {
            self.objects
                .signed_url(&report.storage_path, self.config.signed_url_ttl)
                .await
        } else {
            Ok(report.url.clone())
        }
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Hard delete. The audit entry is written first and outlives the row.
    /// Deleting the pair's last disposition also removes the link.
    pub async fn delete(&self, id: DbId, actor: &Actor) -> Result<(), CoreError> {
        let disposition = self.get(id).await?;
        authorization::require_delete(actor, disposition.created_by)?;

        self.audit
            .change(
                id,
                HistoryAction::AssigneeRemoved,
                Some(disposition.assigned_to.to_string()),
                Some(DELETED_MARKER.to_string()),
                actor.user_id,
            )
            .await;

        let paths = disposition.blob_paths();
        if !paths.is_empty() {
            self.remove_blobs(id, &paths).await;
        }

        let deleted =
            match with_retry(self.retry(), "delete_disposition", || self.store.delete(id)).await {
                Ok(deleted) => deleted,
                Err(e) => {
                    if !paths.is_empty() {
                        tracing::error!(
                            disposition_id = %id,
                            paths = ?paths,
                            error = %e,
                            "Disposition row kept after its report blobs were removed"
                        );
                    }
                    return Err(e);
                }
            };
        if !deleted {
            return Err(CoreError::NotFound {
                entity: ENTITY_DISPOSITION,
                id,
            });
        }

        tracing::info!(disposition_id = %id, user_id = %actor.user_id, "Disposition deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn persist(&self, disposition: &Disposition) -> Result<(), CoreError> {
        let updated = with_retry(self.retry(), "update_disposition", || {
            self.store.update(disposition)
        })
        .await?;
        if updated {
            Ok(())
        } else {
            Err(CoreError::NotFound {
                entity: ENTITY_DISPOSITION,
                id: disposition.id,
            })
        }
    }

    async fn remove_blobs(&self, disposition_id: DbId, paths: &[String]) {
        if let Err(e) = self.objects.remove(paths).await {
            tracing::warn!(
                %disposition_id,
                paths = ?paths,
                error = %e,
                "Failed to remove report blobs"
            );
        }
    }
}
