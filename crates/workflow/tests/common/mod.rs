#![allow(dead_code)]

//! In-memory implementations of every port, with switches for injecting
//! failures.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use surat_core::disposition::{
    Attachment, Disposition, DispositionStatus, HistoryAction, HistoryEntry,
};
use surat_core::error::CoreError;
use surat_core::notifications::NotificationRequest;
use surat_core::ports::{
    DispositionStore, HistoryStore, LinkPayload, LinkStore, Notifier, ObjectStore, ReferenceStore,
};
use surat_core::retry::RetryPolicy;
use surat_core::roles::{Actor, Role};
use surat_core::types::{Date, DbId};
use surat_workflow::lifecycle::CreateDispositions;
use surat_workflow::linking::LinkRequest;
use surat_workflow::{DispositionManager, LinkCoordinator, Ports, WorkflowConfig};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct State {
    pub users: HashSet<DbId>,
    pub letters: HashSet<DbId>,
    /// Activity id -> linked letter id.
    pub activities: HashMap<DbId, Option<DbId>>,
    /// Activity id -> letter id whose metadata was copied onto it.
    pub copied_metadata: HashMap<DbId, DbId>,
    pub dispositions: Vec<Disposition>,
    pub history: Vec<HistoryEntry>,
    pub notifications: Vec<NotificationRequest>,
    pub blobs: HashMap<String, Vec<u8>>,
}

/// Failure switches. Each one affects every call to the named operation
/// until cleared.
#[derive(Debug, Default, Clone)]
pub struct Faults {
    pub history_append: bool,
    pub notify: bool,
    pub blob_upload: bool,
    pub blob_remove: bool,
    pub update: bool,
    pub insert_for: HashSet<DbId>,
    /// Fail inside the link procedure after inserting this many rows.
    pub link_after: Option<usize>,
    /// Fail inside the unlink procedure after deleting this many rows.
    pub unlink_after: Option<usize>,
    pub copy_metadata: bool,
    pub delete: bool,
    /// Transient failures still to be returned by `find_by_id`.
    pub transient_reads: u32,
    /// Operations (`insert`, `link`, `unlink`) whose next call commits and
    /// then reports a transient error, as when the acknowledgement is lost.
    pub lost_acks: HashSet<&'static str>,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    faults: Mutex<Faults>,
    pub find_calls: Mutex<u32>,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap()
    }

    pub fn add_user(&self) -> DbId {
        let id = Uuid::new_v4();
        self.state().users.insert(id);
        id
    }

    pub fn add_letter(&self) -> DbId {
        let id = Uuid::new_v4();
        self.state().letters.insert(id);
        id
    }

    pub fn add_activity(&self) -> DbId {
        let id = Uuid::new_v4();
        self.state().activities.insert(id, None);
        id
    }

    pub fn disposition(&self, id: DbId) -> Option<Disposition> {
        self.state().dispositions.iter().find(|d| d.id == id).cloned()
    }

    pub fn dispositions_for(&self, letter_id: DbId, activity_id: DbId) -> Vec<Disposition> {
        self.state()
            .dispositions
            .iter()
            .filter(|d| d.letter_id == letter_id && d.activity_id == activity_id)
            .cloned()
            .collect()
    }

    /// History for one disposition in write order.
    pub fn history_of(&self, id: DbId) -> Vec<HistoryEntry> {
        self.state()
            .history
            .iter()
            .filter(|h| h.disposition_id == id)
            .cloned()
            .collect()
    }

    pub fn actions_of(&self, id: DbId) -> Vec<HistoryAction> {
        self.history_of(id).into_iter().map(|h| h.action).collect()
    }

    pub fn notifications(&self) -> Vec<NotificationRequest> {
        self.state().notifications.clone()
    }

    pub fn linked_letter_of(&self, activity_id: DbId) -> Option<DbId> {
        self.state().activities.get(&activity_id).copied().flatten()
    }

    pub fn put_blob(&self, path: &str) {
        self.state().blobs.insert(path.to_string(), b"blob".to_vec());
    }

    pub fn has_blob(&self, path: &str) -> bool {
        self.state().blobs.contains_key(path)
    }

    /// Arm a lost acknowledgement for the next call of `operation`.
    pub fn lose_ack(&self, operation: &'static str) {
        self.faults().lost_acks.insert(operation);
    }

    fn take_lost_ack(&self, operation: &'static str) -> bool {
        self.faults().lost_acks.remove(operation)
    }
}

fn lost_ack(operation: &str) -> CoreError {
    CoreError::Database {
        message: format!("connection reset after {operation}"),
        transient: true,
    }
}

fn store_failure(operation: &str) -> CoreError {
    CoreError::Database {
        message: format!("{operation} failed"),
        transient: false,
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

#[async_trait]
impl DispositionStore for MemoryBackend {
    async fn insert(&self, disposition: &Disposition) -> Result<(), CoreError> {
        if self.faults().insert_for.contains(&disposition.assigned_to) {
            return Err(store_failure("insert"));
        }
        {
            let mut state = self.state();
            let linked = state.activities.get(&disposition.activity_id).copied().flatten();
            if linked != Some(disposition.letter_id) {
                return Err(CoreError::Conflict(format!(
                    "Letter {} is not linked to activity {}",
                    disposition.letter_id, disposition.activity_id
                )));
            }
            if !state.dispositions.iter().any(|d| d.id == disposition.id) {
                state.dispositions.push(disposition.clone());
            }
        }
        if self.take_lost_ack("insert") {
            return Err(lost_ack("insert"));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Disposition>, CoreError> {
        *self.find_calls.lock().unwrap() += 1;
        {
            let mut faults = self.faults();
            if faults.transient_reads > 0 {
                faults.transient_reads -= 1;
                return Err(CoreError::Database {
                    message: "connection reset".into(),
                    transient: true,
                });
            }
        }
        Ok(self.disposition(id))
    }

    async fn update(&self, disposition: &Disposition) -> Result<bool, CoreError> {
        if self.faults().update {
            return Err(store_failure("update"));
        }
        let mut state = self.state();
        match state.dispositions.iter_mut().find(|d| d.id == disposition.id) {
            Some(row) => {
                *row = disposition.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: DbId) -> Result<bool, CoreError> {
        if self.faults().delete {
            return Err(store_failure("delete"));
        }
        let mut state = self.state();
        let Some(position) = state.dispositions.iter().position(|d| d.id == id) else {
            return Ok(false);
        };
        let removed = state.dispositions.remove(position);
        let pair_left = state
            .dispositions
            .iter()
            .any(|d| d.letter_id == removed.letter_id && d.activity_id == removed.activity_id);
        if !pair_left {
            if let Some(slot) = state.activities.get_mut(&removed.activity_id) {
                if *slot == Some(removed.letter_id) {
                    *slot = None;
                }
            }
        }
        Ok(true)
    }

    async fn list_for_link(
        &self,
        letter_id: DbId,
        activity_id: DbId,
    ) -> Result<Vec<Disposition>, CoreError> {
        Ok(self.dispositions_for(letter_id, activity_id))
    }

    async fn list_assigned_to(&self, user_id: DbId) -> Result<Vec<Disposition>, CoreError> {
        Ok(self
            .state()
            .dispositions
            .iter()
            .filter(|d| d.assigned_to == user_id)
            .cloned()
            .collect())
    }

    async fn list_due_by(&self, until: Date) -> Result<Vec<Disposition>, CoreError> {
        Ok(self
            .state()
            .dispositions
            .iter()
            .filter(|d| !d.status.is_terminal() && d.deadline.is_some_and(|dl| dl <= until))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HistoryStore for MemoryBackend {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), CoreError> {
        if self.faults().history_append {
            return Err(store_failure("append_history"));
        }
        self.state().history.push(entry.clone());
        Ok(())
    }

    async fn list_for_disposition(
        &self,
        disposition_id: DbId,
    ) -> Result<Vec<HistoryEntry>, CoreError> {
        let mut entries = self.history_of(disposition_id);
        entries.reverse();
        Ok(entries)
    }
}

#[async_trait]
impl ReferenceStore for MemoryBackend {
    async fn letter_exists(&self, id: DbId) -> Result<bool, CoreError> {
        Ok(self.state().letters.contains(&id))
    }

    async fn activity_exists(&self, id: DbId) -> Result<bool, CoreError> {
        Ok(self.state().activities.contains_key(&id))
    }

    async fn missing_users(&self, ids: &[DbId]) -> Result<Vec<DbId>, CoreError> {
        let state = self.state();
        Ok(ids.iter().copied().filter(|id| !state.users.contains(id)).collect())
    }
}

#[async_trait]
impl LinkStore for MemoryBackend {
    async fn link_letter_to_activity(
        &self,
        letter_id: DbId,
        activity_id: DbId,
        payload: &LinkPayload,
    ) -> Result<Vec<DbId>, CoreError> {
        let fail_after = self.faults().link_after;
        let mut state = self.state();
        // Work on a copy and commit only on success.
        let mut draft = state.clone();

        match draft.activities.get(&activity_id) {
            None => return Err(CoreError::missing("Activity", activity_id)),
            Some(Some(current)) => {
                // Replay of a committed call: hand back the rows it created.
                if *current == letter_id {
                    let replayed: Vec<DbId> = payload
                        .assignees
                        .iter()
                        .filter_map(|assignee| {
                            draft
                                .dispositions
                                .iter()
                                .find(|d| {
                                    d.letter_id == letter_id
                                        && d.activity_id == activity_id
                                        && d.assigned_to == *assignee
                                        && d.created_by == payload.created_by
                                        && d.created_at == payload.created_at
                                })
                                .map(|d| d.id)
                        })
                        .collect();
                    if replayed.len() == payload.assignees.len() {
                        return Ok(replayed);
                    }
                }
                return Err(CoreError::Conflict("Activity is already linked".into()));
            }
            Some(None) => {
                draft.activities.insert(activity_id, Some(letter_id));
            }
        }

        let mut ids = Vec::with_capacity(payload.assignees.len());
        for (index, assignee) in payload.assignees.iter().copied().enumerate() {
            if fail_after == Some(index) {
                return Err(store_failure("link_letter_to_activity"));
            }
            if !draft.users.contains(&assignee) {
                return Err(CoreError::missing("User", assignee));
            }
            let id = Uuid::new_v4();
            draft.dispositions.push(Disposition {
                id,
                letter_id,
                activity_id,
                assigned_to: assignee,
                instruction_text: payload.instruction_text.clone(),
                status: DispositionStatus::Pending,
                deadline: payload.deadline,
                reports: Vec::new(),
                attachments: payload.attachments.clone(),
                notes: None,
                created_by: payload.created_by,
                created_at: payload.created_at,
                updated_at: None,
                completed_at: None,
                completed_by: None,
                parent_disposition_id: None,
            });
            ids.push(id);
        }

        *state = draft;
        drop(state);
        if self.take_lost_ack("link") {
            return Err(lost_ack("link"));
        }
        Ok(ids)
    }

    async fn unlink_letter_from_activity(
        &self,
        letter_id: DbId,
        activity_id: DbId,
    ) -> Result<(), CoreError> {
        let fail_after = self.faults().unlink_after;
        let mut state = self.state();
        match state.activities.get(&activity_id) {
            None => return Err(CoreError::missing("Activity", activity_id)),
            Some(None) => return Ok(()),
            Some(Some(current)) if *current != letter_id => {
                return Err(CoreError::Conflict("Activity is linked to another letter".into()));
            }
            Some(Some(_)) => {}
        }
        let mut draft = state.clone();

        let mut removed = 0;
        let mut kept = Vec::with_capacity(draft.dispositions.len());
        for d in draft.dispositions.drain(..) {
            if d.letter_id == letter_id && d.activity_id == activity_id {
                if fail_after == Some(removed) {
                    return Err(store_failure("unlink_letter_from_activity"));
                }
                removed += 1;
            } else {
                kept.push(d);
            }
        }
        draft.dispositions = kept;
        if let Some(slot) = draft.activities.get_mut(&activity_id) {
            *slot = None;
        }

        *state = draft;
        drop(state);
        if self.take_lost_ack("unlink") {
            return Err(lost_ack("unlink"));
        }
        Ok(())
    }

    async fn linked_letter(&self, activity_id: DbId) -> Result<Option<DbId>, CoreError> {
        Ok(self.linked_letter_of(activity_id))
    }

    async fn copy_letter_metadata(
        &self,
        letter_id: DbId,
        activity_id: DbId,
    ) -> Result<(), CoreError> {
        if self.faults().copy_metadata {
            return Err(store_failure("copy_letter_metadata"));
        }
        self.state().copied_metadata.insert(activity_id, letter_id);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn upload(&self, path: &str, bytes: &[u8], _mime_type: &str) -> Result<String, CoreError> {
        if self.faults().blob_upload {
            // Half the bytes land before the connection drops.
            let partial = bytes[..bytes.len() / 2].to_vec();
            self.state().blobs.insert(path.to_string(), partial);
            return Err(CoreError::FileUpload("connection dropped mid-write".into()));
        }
        self.state().blobs.insert(path.to_string(), bytes.to_vec());
        Ok(format!("memory://{path}"))
    }

    async fn remove(&self, paths: &[String]) -> Result<(), CoreError> {
        if self.faults().blob_remove {
            return Err(CoreError::FileUpload("bucket unavailable".into()));
        }
        let mut state = self.state();
        for path in paths {
            state.blobs.remove(path);
        }
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, CoreError> {
        Ok(format!("memory://{path}?ttl={}", ttl.as_secs()))
    }
}

#[async_trait]
impl Notifier for MemoryBackend {
    async fn notify(&self, request: NotificationRequest) -> Result<(), CoreError> {
        if self.faults().notify {
            return Err(CoreError::Notification("channel closed".into()));
        }
        self.state().notifications.push(request);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub manager: DispositionManager,
    pub links: LinkCoordinator,
    pub letter: DbId,
    pub activity: DbId,
    pub creator: DbId,
}

pub fn harness() -> Harness {
    let backend = MemoryBackend::new();
    let ports = Ports {
        dispositions: backend.clone(),
        history: backend.clone(),
        references: backend.clone(),
        links: backend.clone(),
        objects: backend.clone(),
        notifier: backend.clone(),
    };
    let config = WorkflowConfig {
        retry: RetryPolicy::immediate(),
        ..WorkflowConfig::default()
    };
    let letter = backend.add_letter();
    let activity = backend.add_activity();
    let creator = backend.add_user();
    Harness {
        manager: DispositionManager::new(&ports, config),
        links: LinkCoordinator::new(&ports, config),
        backend,
        letter,
        activity,
        creator,
    }
}

/// A harness whose pair is already linked, see [`Harness::link_pair`].
pub async fn linked_harness() -> Harness {
    let h = harness();
    h.link_pair().await;
    h
}

impl Harness {
    /// Link the pair through one disposition for a fresh assignee, unless it
    /// is linked already. The link's notifications are discarded.
    pub async fn link_pair(&self) {
        if self.backend.linked_letter_of(self.activity) == Some(self.letter) {
            return;
        }
        let request = LinkRequest {
            assignees: vec![self.backend.add_user()],
            instruction_text: "Attend and report back".into(),
            deadline: None,
            attachments: Vec::new(),
        };
        self.links
            .link(self.letter, self.activity, request, &self.supervisor())
            .await
            .unwrap();
        self.backend.state().notifications.clear();
    }

    pub fn creator_actor(&self) -> Actor {
        Actor::new(self.creator, Role::Staff)
    }

    pub fn supervisor(&self) -> Actor {
        Actor::new(self.backend.add_user(), Role::Supervisor)
    }

    pub fn super_admin(&self) -> Actor {
        Actor::new(self.backend.add_user(), Role::SuperAdmin)
    }

    pub fn staff(&self) -> Actor {
        Actor::new(self.backend.add_user(), Role::Staff)
    }

    pub fn request(&self, assignees: Vec<DbId>, text: &str) -> CreateDispositions {
        CreateDispositions {
            letter_id: self.letter,
            activity_id: self.activity,
            assignees,
            instruction_text: text.to_string(),
            deadline: None,
            attachments: Vec::new(),
            created_by: self.creator,
        }
    }

    /// Create a single disposition assigned to a fresh user on the linked
    /// pair.
    pub async fn seed(&self, text: &str) -> Disposition {
        self.link_pair().await;
        let assignee = self.backend.add_user();
        let outcome = self
            .manager
            .create(self.request(vec![assignee], text), &self.creator_actor())
            .await
            .unwrap();
        outcome.created.into_iter().next().unwrap()
    }
}

pub fn report(name: &str) -> Attachment {
    Attachment::link(name, format!("https://docs.example.org/{name}"))
}

pub fn date(y: i32, m: u32, d: u32) -> Date {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
