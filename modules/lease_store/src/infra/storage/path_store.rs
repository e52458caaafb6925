//! Hierarchical-path backend for the domain storage port.
//!
//! Every entity is written as a single item under all of its key paths, so
//! the primary record and its index aliases change together. A lease's
//! primary path nests it under its user and resource; listing is a prefix
//! scan. There is no native TTL: expired leases stay readable until
//! [`HierarchicalStore::reap_expired`] removes them.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::contract::model::{Entity, EntityKind, Lease, User};
use crate::domain::keys;
use crate::domain::repo::{LeaseStorage, StorageError};
use crate::infra::storage::memory_kv::{PathItem, PathKv};
use crate::infra::storage::record;

pub struct HierarchicalStore {
    kv: Arc<dyn PathKv>,
}

impl HierarchicalStore {
    pub fn new(kv: Arc<dyn PathKv>) -> Self {
        Self { kv }
    }

    /// Delete every lease that is expired at `now`. Returns how many were removed.
    ///
    /// Intended to be driven by an external scheduler; reads never filter
    /// expired leases on their own.
    pub async fn reap_expired(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let prefix = "/lease-";
        let entries = self
            .kv
            .list_prefix(prefix)
            .await
            .context("scan lease id paths")
            .map_err(|e| StorageError::unavailable(EntityKind::Lease, prefix, e))?;

        let mut removed = 0;
        for (path, payload) in entries {
            let lease = decode_lease(&path, &payload)?;
            if !lease.is_expired(now) {
                continue;
            }
            let deleted = self
                .kv
                .delete(&path)
                .await
                .context("delete expired lease")
                .map_err(|e| StorageError::unavailable(EntityKind::Lease, path.as_str(), e))?;
            if deleted {
                debug!(lease_id = %lease.id, "Reaped expired lease");
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn load(&self, kind: EntityKind, path: &str) -> Result<Option<Entity>, StorageError> {
        let payload = self
            .kv
            .get(path)
            .await
            .with_context(|| format!("get {path}"))
            .map_err(|e| {
                warn!(error = %e, "Hierarchical store read failed");
                StorageError::unavailable(kind, path, e)
            })?;
        payload
            .map(|bytes| decode_as(kind, path, &bytes))
            .transpose()
    }

    async fn scan_leases(&self, prefix: &str) -> Result<Vec<Lease>, StorageError> {
        let entries = self
            .kv
            .list_prefix(prefix)
            .await
            .with_context(|| format!("scan {prefix}"))
            .map_err(|e| {
                warn!(error = %e, "Hierarchical store scan failed");
                StorageError::unavailable(EntityKind::Lease, prefix, e)
            })?;
        entries
            .iter()
            .map(|(path, payload)| decode_lease(path, payload))
            .collect()
    }
}

fn decode_as(kind: EntityKind, path: &str, payload: &[u8]) -> Result<Entity, StorageError> {
    let entity =
        record::decode(payload).map_err(|e| StorageError::corrupt(kind, path, e.to_string()))?;
    if entity.kind() != kind {
        return Err(StorageError::corrupt(
            kind,
            path,
            format!("found a {} record", entity.kind()),
        ));
    }
    Ok(entity)
}

fn decode_lease(path: &str, payload: &[u8]) -> Result<Lease, StorageError> {
    decode_as(EntityKind::Lease, path, payload)?
        .into_lease()
        .ok_or_else(|| StorageError::corrupt(EntityKind::Lease, path, "not a lease"))
}

#[async_trait]
impl LeaseStorage for HierarchicalStore {
    fn name(&self) -> &'static str {
        "hierarchical"
    }

    async fn put(&self, entity: &Entity) -> Result<(), StorageError> {
        let key_paths = keys::key_paths(entity);
        let primary = key_paths.first().cloned().unwrap_or_default();
        let payload = record::encode(entity)
            .map_err(|e| StorageError::corrupt(entity.kind(), primary.as_str(), e.to_string()))?;

        self.kv
            .put(PathItem { key_paths, payload })
            .await
            .with_context(|| format!("put {primary}"))
            .map_err(|e| {
                warn!(error = %e, "Hierarchical store write failed");
                StorageError::unavailable(entity.kind(), primary, e)
            })
    }

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, StorageError> {
        self.load(kind, &keys::id_path(kind, id)).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let path = keys::user_email_path(email);
        Ok(self
            .load(EntityKind::User, &path)
            .await?
            .and_then(Entity::into_user))
    }

    async fn list_leases_by_user(&self, user_id: Uuid) -> Result<Vec<Lease>, StorageError> {
        self.scan_leases(&keys::leases_by_user_prefix(user_id)).await
    }

    async fn list_leases_by_resource(
        &self,
        resource_id: Uuid,
    ) -> Result<Vec<Lease>, StorageError> {
        self.scan_leases(&keys::leases_by_resource_prefix(resource_id))
            .await
    }

    async fn delete_lease(&self, id: Uuid) -> Result<bool, StorageError> {
        let path = keys::lease_path(id);
        self.kv
            .delete(&path)
            .await
            .with_context(|| format!("delete {path}"))
            .map_err(|e| StorageError::unavailable(EntityKind::Lease, path, e))
    }
}
