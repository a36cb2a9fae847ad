use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::{Authorizer, RoleCapabilities};
use crate::config::EngineSettings;
use crate::engine::ledger::Ledger;
use crate::error::AppError;
use crate::models::client::ClientPolicy;
use crate::models::shipment::{Shipment, ShipmentStatus};
use crate::models::transaction::CourierTransaction;
use crate::observability::metrics::Metrics;

/// Everything the engine owns. Held behind one lock so that a delivery and
/// its ledger credit commit together and readers never see half of it.
#[derive(Debug, Default)]
pub struct Store {
    pub shipments: HashMap<Uuid, Shipment>,
    pub clients: HashMap<Uuid, ClientPolicy>,
    pub ledger: Ledger,
}

impl Store {
    pub fn shipment(&self, id: Uuid) -> Result<&Shipment, AppError> {
        self.shipments
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("shipment {id} not found")))
    }

    pub fn client(&self, id: Uuid) -> Result<&ClientPolicy, AppError> {
        self.clients
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("client {id} not found")))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConsoleEvent {
    ShipmentTransitioned {
        shipment_id: Uuid,
        from: ShipmentStatus,
        to: ShipmentStatus,
        at: chrono::DateTime<chrono::Utc>,
    },
    LedgerPosted(CourierTransaction),
}

pub struct AppState {
    store: RwLock<Store>,
    pub authorizer: Arc<dyn Authorizer>,
    pub settings: EngineSettings,
    pub events_tx: broadcast::Sender<ConsoleEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize, settings: EngineSettings) -> Self {
        Self::with_authorizer(event_buffer_size, settings, Arc::new(RoleCapabilities))
    }

    pub fn with_authorizer(
        event_buffer_size: usize,
        settings: EngineSettings,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            store: RwLock::new(Store::default()),
            authorizer,
            settings,
            events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, Store>, AppError> {
        self.store
            .read()
            .map_err(|err| AppError::Internal(format!("store lock poisoned: {err}")))
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Store>, AppError> {
        self.store
            .write()
            .map_err(|err| AppError::Internal(format!("store lock poisoned: {err}")))
    }

    pub fn publish(&self, event: ConsoleEvent) {
        let _ = self.events_tx.send(event);
    }
}
