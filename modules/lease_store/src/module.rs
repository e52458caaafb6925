use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::config::{BackendKind, LeaseStoreConfig};
use crate::contract::client::LeaseStoreApi;
use crate::contract::error::LeaseStoreError;
use crate::domain::clock::Clock;
use crate::domain::error::DomainError;
use crate::domain::repo::LeaseStorage;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::LeaseStoreLocalClient;
use crate::infra::storage::{
    HierarchicalStore, MemoryPathKv, MemoryTable, MemoryTableOptions, SingleTableStore,
};

/// Storage product behind the service, kept for maintenance hooks.
enum Backend {
    Hierarchical {
        kv: Arc<MemoryPathKv>,
        store: Arc<HierarchicalStore>,
    },
    SingleTable {
        table: Arc<MemoryTable>,
    },
}

/// Wired lease store: one backend, one domain service, one local client.
pub struct LeaseStoreModule {
    service: Arc<Service>,
    backend: Backend,
    clock: Arc<dyn Clock>,
}

impl LeaseStoreModule {
    pub fn init(config: &LeaseStoreConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        info!("Initializing lease_store module");
        debug!(
            "Loaded lease_store config: backend={}, table_name={}, index_propagation_delay={:?}, enforce_references={}",
            config.backend.as_str(),
            config.table_name,
            config.index_propagation_delay,
            config.enforce_references
        );

        let (backend, storage): (Backend, Arc<dyn LeaseStorage>) = match config.backend {
            BackendKind::Hierarchical => {
                let kv = Arc::new(MemoryPathKv::new());
                let store = Arc::new(HierarchicalStore::new(kv.clone()));
                let storage: Arc<dyn LeaseStorage> = store.clone();
                (Backend::Hierarchical { kv, store }, storage)
            }
            BackendKind::SingleTable => {
                let delay = chrono::Duration::from_std(config.index_propagation_delay)
                    .context("index_propagation_delay is out of range")?;
                let table = Arc::new(MemoryTable::new(
                    MemoryTableOptions {
                        table_name: config.table_name.clone(),
                        index_propagation_delay: delay,
                    },
                    clock.clone(),
                ));
                let storage: Arc<dyn LeaseStorage> =
                    Arc::new(SingleTableStore::new(table.clone()));
                (Backend::SingleTable { table }, storage)
            }
        };

        let service_config = ServiceConfig {
            enforce_references: config.enforce_references,
        };
        let service = Arc::new(Service::new(storage, clock.clone(), service_config));
        info!("lease_store ready with {} backend", service.backend_name());

        Ok(Self {
            service,
            backend,
            clock,
        })
    }

    /// Local in-process client implementation
    pub fn client(&self) -> Arc<dyn LeaseStoreApi> {
        Arc::new(LeaseStoreLocalClient::new(self.service.clone()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.service.backend_name()
    }

    /// Run the backend's expiry collection once and return how many leases it removed.
    ///
    /// Hierarchical: delete every lease expired at the clock's now.
    /// Single table: sweep items whose TTL attribute has passed.
    pub async fn collect_expired(&self) -> Result<usize, LeaseStoreError> {
        let removed = match &self.backend {
            Backend::Hierarchical { store, .. } => store
                .reap_expired(self.clock.now())
                .await
                .map_err(DomainError::from)?,
            Backend::SingleTable { table } => table.sweep_expired(),
        };
        if removed > 0 {
            info!("Collected {} expired leases", removed);
        }
        Ok(removed)
    }

    /// Simulate a storage outage (every backend call fails while set).
    pub fn set_backend_offline(&self, offline: bool) {
        match &self.backend {
            Backend::Hierarchical { kv, .. } => kv.set_offline(offline),
            Backend::SingleTable { table } => table.set_offline(offline),
        }
    }
}

/// Build a ready-to-use client over a freshly constructed backend.
pub fn build_client(
    config: &LeaseStoreConfig,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Arc<dyn LeaseStoreApi>> {
    Ok(LeaseStoreModule::init(config, clock)?.client())
}
