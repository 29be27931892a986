//! Letter to activity linking.
//!
//! Linking marks the activity as belonging to the letter and creates one
//! disposition per assignee in a single store transaction. Unlinking reverses
//! both. History, notifications and metadata copy run after commit and never
//! fail the operation.

use std::sync::Arc;

use chrono::Utc;
use surat_core::authorization;
use surat_core::disposition::{
    validate_assignees, validate_instruction_text, Attachment, Disposition, HistoryAction,
    UNLINKED_MARKER,
};
use surat_core::error::CoreError;
use surat_core::notifications::NotificationRequest;
use surat_core::ports::{DispositionStore, LinkPayload, LinkStore, Notifier, ObjectStore};
use surat_core::retry::{with_retry, RetryPolicy};
use surat_core::roles::Actor;
use surat_core::types::{Date, DbId};

use crate::audit::AuditRecorder;
use crate::hooks::PostCommit;
use crate::lifecycle::{own_copies, validate_creation_attachments};
use crate::references::ReferenceValidator;
use crate::{Ports, WorkflowConfig};

#[derive(Debug, Clone)]
pub struct LinkRequest {
    pub assignees: Vec<DbId>,
    pub instruction_text: String,
    pub deadline: Option<Date>,
    pub attachments: Vec<Attachment>,
}

/// Result of a successful link.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LinkOutcome {
    pub letter_id: DbId,
    pub activity_id: DbId,
    pub disposition_ids: Vec<DbId>,
    /// Whether letter metadata reached the activity. The link stands either
    /// way.
    pub metadata_copied: bool,
}

#[derive(Clone)]
pub struct LinkCoordinator {
    links: Arc<dyn LinkStore>,
    dispositions: Arc<dyn DispositionStore>,
    objects: Arc<dyn ObjectStore>,
    notifier: Arc<dyn Notifier>,
    references: ReferenceValidator,
    audit: AuditRecorder,
    retry: RetryPolicy,
}

impl LinkCoordinator {
    pub fn new(ports: &Ports, config: WorkflowConfig) -> Self {
        Self {
            links: Arc::clone(&ports.links),
            dispositions: Arc::clone(&ports.dispositions),
            objects: Arc::clone(&ports.objects),
            notifier: Arc::clone(&ports.notifier),
            references: ReferenceValidator::new(Arc::clone(&ports.references), config.retry),
            audit: AuditRecorder::new(Arc::clone(&ports.history), config.retry),
            retry: config.retry,
        }
    }

    /// Link `letter_id` to `activity_id` and create the dispositions.
    ///
    /// All or nothing: if any assignee cannot be inserted the activity stays
    /// unlinked and no disposition exists.
    pub async fn link(
        &self,
        letter_id: DbId,
        activity_id: DbId,
        request: LinkRequest,
        actor: &Actor,
    ) -> Result<LinkOutcome, CoreError> {
        authorization::require_link(actor)?;
        let instruction_text = validate_instruction_text(&request.instruction_text)?;
        let assignees = validate_assignees(&request.assignees)?;
        validate_creation_attachments(&request.attachments)?;

        self.references.require_pair(letter_id, activity_id).await?;
        self.references.require_users(&assignees).await?;

        let current = with_retry(&self.retry, "linked_letter", || {
            self.links.linked_letter(activity_id)
        })
        .await?;
        if let Some(existing) = current {
            let message = if existing == letter_id {
                "Activity is already linked to this letter".to_string()
            } else {
                format!("Activity is already linked to letter {existing}")
            };
            return Err(CoreError::Conflict(message));
        }

        let payload = LinkPayload {
            assignees,
            instruction_text,
            deadline: request.deadline,
            attachments: own_copies(&request.attachments),
            created_by: actor.user_id,
            created_at: Utc::now(),
        };
        let disposition_ids = with_retry(&self.retry, "link_letter_to_activity", || {
            self.links
                .link_letter_to_activity(letter_id, activity_id, &payload)
        })
        .await?;

        tracing::info!(
            %letter_id,
            %activity_id,
            dispositions = disposition_ids.len(),
            user_id = %actor.user_id,
            "Letter linked to activity"
        );

        let created = self.created_dispositions(letter_id, activity_id, &disposition_ids).await;
        for disposition in &created {
            self.audit
                .change(
                    disposition.id,
                    HistoryAction::Created,
                    None,
                    Some(disposition.assigned_to.to_string()),
                    actor.user_id,
                )
                .await;
        }

        let mut hooks = PostCommit::new();
        for disposition in &created {
            hooks.notify_unless_actor(NotificationRequest::assigned(disposition), actor.user_id);
        }
        hooks.run(self.notifier.as_ref()).await;

        let metadata_copied = match self.copy_metadata_inner(letter_id, activity_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    %letter_id,
                    %activity_id,
                    error = %e,
                    "Letter metadata copy failed after link"
                );
                false
            }
        };

        Ok(LinkOutcome {
            letter_id,
            activity_id,
            disposition_ids,
            metadata_copied,
        })
    }

    /// Remove the link and every disposition of the pair.
    pub async fn unlink(
        &self,
        letter_id: DbId,
        activity_id: DbId,
        actor: &Actor,
    ) -> Result<(), CoreError> {
        authorization::require_link(actor)?;

        let current = with_retry(&self.retry, "linked_letter", || {
            self.links.linked_letter(activity_id)
        })
        .await?;
        if current != Some(letter_id) {
            return Err(CoreError::NotFound {
                entity: "Link",
                id: activity_id,
            });
        }

        // Snapshot before the rows go away so history and blobs can follow.
        let doomed = with_retry(&self.retry, "list_for_link", || {
            self.dispositions.list_for_link(letter_id, activity_id)
        })
        .await?;

        with_retry(&self.retry, "unlink_letter_from_activity", || {
            self.links.unlink_letter_from_activity(letter_id, activity_id)
        })
        .await?;

        tracing::info!(
            %letter_id,
            %activity_id,
            dispositions = doomed.len(),
            user_id = %actor.user_id,
            "Letter unlinked from activity"
        );

        for disposition in &doomed {
            self.audit
                .change(
                    disposition.id,
                    HistoryAction::AssigneeRemoved,
                    Some(disposition.assigned_to.to_string()),
                    Some(UNLINKED_MARKER.to_string()),
                    actor.user_id,
                )
                .await;
        }

        let paths: Vec<String> = doomed.iter().flat_map(Disposition::blob_paths).collect();
        if !paths.is_empty() {
            if let Err(e) = self.objects.remove(&paths).await {
                tracing::warn!(
                    %letter_id,
                    %activity_id,
                    paths = ?paths,
                    error = %e,
                    "Failed to remove blobs of unlinked dispositions"
                );
            }
        }
        Ok(())
    }

    /// Copy the letter's descriptive fields onto the activity. Safe to
    /// repeat.
    pub async fn copy_metadata(
        &self,
        letter_id: DbId,
        activity_id: DbId,
        actor: &Actor,
    ) -> Result<(), CoreError> {
        authorization::require_link(actor)?;
        self.references.require_pair(letter_id, activity_id).await?;
        self.copy_metadata_inner(letter_id, activity_id).await
    }

    async fn copy_metadata_inner(&self, letter_id: DbId, activity_id: DbId) -> Result<(), CoreError> {
        with_retry(&self.retry, "copy_letter_metadata", || {
            self.links.copy_letter_metadata(letter_id, activity_id)
        })
        .await
    }

    /// Load the rows the procedure just created, in the order it returned
    /// their ids. A failed read only costs the post-commit work.
    async fn created_dispositions(
        &self,
        letter_id: DbId,
        activity_id: DbId,
        ids: &[DbId],
    ) -> Vec<Disposition> {
        match with_retry(&self.retry, "list_for_link", || {
            self.dispositions.list_for_link(letter_id, activity_id)
        })
        .await
        {
            Ok(rows) => ids
                .iter()
                .filter_map(|id| rows.iter().find(|d| d.id == *id).cloned())
                .collect(),
            Err(e) => {
                tracing::warn!(
                    %letter_id,
                    %activity_id,
                    error = %e,
                    "Could not load linked dispositions for post-commit work"
                );
                Vec::new()
            }
        }
    }
}
