use std::sync::Arc;

use surat_db::{DbPool, PgStore};
use surat_events::{BusNotifier, EventBus};
use surat_workflow::{DispositionManager, LinkCoordinator, Ports};

use crate::config::ServerConfig;
use crate::storage::LocalObjectStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
    /// Bus the workflow publishes notifications to.
    pub event_bus: Arc<EventBus>,
    pub objects: Arc<LocalObjectStore>,
    pub ports: Ports,
    pub dispositions: DispositionManager,
    pub links: LinkCoordinator,
}

impl AppState {
    /// Wire the workflow services to PostgreSQL, the local object store and
    /// the event bus.
    pub fn new(pool: DbPool, config: ServerConfig, event_bus: Arc<EventBus>) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        let objects = Arc::new(LocalObjectStore::new(&config.storage));
        let ports = Ports {
            dispositions: store.clone(),
            history: store.clone(),
            references: store.clone(),
            links: store,
            objects: objects.clone(),
            notifier: Arc::new(BusNotifier::new(Arc::clone(&event_bus))),
        };
        let workflow = config.workflow();

        Self {
            pool,
            config: Arc::new(config),
            event_bus,
            objects,
            dispositions: DispositionManager::new(&ports, workflow),
            links: LinkCoordinator::new(&ports, workflow),
            ports,
        }
    }
}
