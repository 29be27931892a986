//! Disposition workflow services.
//!
//! - [`references::ReferenceValidator`] confirms letters, activities and users
//!   exist before anything is written.
//! - [`audit::AuditRecorder`] appends history entries; its failures are
//!   logged, never propagated.
//! - [`lifecycle::DispositionManager`] owns create, status, notes, deadline,
//!   instruction, delegation, report and delete operations.
//! - [`linking::LinkCoordinator`] is the only path that links or unlinks a
//!   letter and an activity, using the store's atomic procedures. Deleting
//!   the last disposition of a pair also drops its link.
//! - [`hooks::PostCommit`] collects best-effort notifications and runs them
//!   after the primary write.

pub mod audit;
pub mod hooks;
pub mod lifecycle;
pub mod linking;
pub mod references;

use std::sync::Arc;
use std::time::Duration;

use surat_core::ports::{
    DispositionStore, HistoryStore, LinkStore, Notifier, ObjectStore, ReferenceStore,
};
use surat_core::retry::RetryPolicy;

pub use lifecycle::DispositionManager;
pub use linking::LinkCoordinator;

/// Default lifetime of signed report URLs.
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

/// The collaborators every service is built from.
#[derive(Clone)]
pub struct Ports {
    pub dispositions: Arc<dyn DispositionStore>,
    pub history: Arc<dyn HistoryStore>,
    pub references: Arc<dyn ReferenceStore>,
    pub links: Arc<dyn LinkStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkflowConfig {
    pub retry: RetryPolicy,
    pub signed_url_ttl: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
        }
    }
}
