//! Single-table backend for the domain storage port.
//!
//! Each entity is one item carrying its index keys, so the primary record and
//! its projections are written by a single item write. Index queries are only
//! eventually consistent: a fresh write may take up to the table's
//! propagation delay to show up in `list_leases_by_*` or email lookups.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::contract::model::{Entity, EntityKind, Lease, User};
use crate::domain::keys::{self, IndexName};
use crate::domain::repo::{LeaseStorage, StorageError};
use crate::infra::storage::item::{self, Item, METADATA_SORT_KEY};
use crate::infra::storage::memory_table::ItemTable;

pub struct SingleTableStore {
    table: Arc<dyn ItemTable>,
}

impl SingleTableStore {
    pub fn new(table: Arc<dyn ItemTable>) -> Self {
        Self { table }
    }

    async fn query_leases(
        &self,
        index: IndexName,
        partition: String,
    ) -> Result<Vec<Lease>, StorageError> {
        let items = self
            .table
            .query(index, &partition)
            .await
            .with_context(|| format!("query {} for {partition}", index.as_str()))
            .map_err(|e| {
                warn!(error = %e, "Index query failed");
                StorageError::unavailable(EntityKind::Lease, partition.as_str(), e)
            })?;
        items
            .iter()
            .map(|i| decode_as(EntityKind::Lease, &partition, i))
            .map(|r| {
                r.and_then(|e| {
                    e.into_lease().ok_or_else(|| {
                        StorageError::corrupt(EntityKind::Lease, partition.as_str(), "not a lease")
                    })
                })
            })
            .collect()
    }
}

fn decode_as(kind: EntityKind, key: &str, item: &Item) -> Result<Entity, StorageError> {
    let entity =
        item::item_to_entity(item).map_err(|e| StorageError::corrupt(kind, key, e.to_string()))?;
    if entity.kind() != kind {
        return Err(StorageError::corrupt(
            kind,
            key,
            format!("found a {} item", entity.kind()),
        ));
    }
    Ok(entity)
}

#[async_trait]
impl LeaseStorage for SingleTableStore {
    fn name(&self) -> &'static str {
        "single_table"
    }

    async fn put(&self, entity: &Entity) -> Result<(), StorageError> {
        let key = keys::primary_key(entity.kind(), entity.id());
        self.table
            .put_item(item::entity_to_item(entity))
            .await
            .with_context(|| format!("put_item {key}"))
            .map_err(|e| {
                warn!(error = %e, "Table write failed");
                StorageError::unavailable(entity.kind(), key, e)
            })
    }

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, StorageError> {
        let key = keys::primary_key(kind, id);
        let found = self
            .table
            .get_item(&key, METADATA_SORT_KEY)
            .await
            .with_context(|| format!("get_item {key}"))
            .map_err(|e| StorageError::unavailable(kind, key.as_str(), e))?;
        found.map(|i| decode_as(kind, &key, &i)).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let partition = keys::email_key(email);
        let items = self
            .table
            .query(IndexName::UserByEmail, &partition)
            .await
            .with_context(|| format!("query GSI3 for {partition}"))
            .map_err(|e| StorageError::unavailable(EntityKind::User, partition.as_str(), e))?;
        match items.first() {
            Some(i) => Ok(decode_as(EntityKind::User, &partition, i)?.into_user()),
            None => Ok(None),
        }
    }

    async fn list_leases_by_user(&self, user_id: Uuid) -> Result<Vec<Lease>, StorageError> {
        self.query_leases(IndexName::LeasesByUser, keys::user_key(user_id))
            .await
    }

    async fn list_leases_by_resource(
        &self,
        resource_id: Uuid,
    ) -> Result<Vec<Lease>, StorageError> {
        self.query_leases(IndexName::LeasesByResource, keys::resource_key(resource_id))
            .await
    }

    async fn delete_lease(&self, id: Uuid) -> Result<bool, StorageError> {
        let key = keys::lease_key(id);
        self.table
            .delete_item(&key, METADATA_SORT_KEY)
            .await
            .with_context(|| format!("delete_item {key}"))
            .map_err(|e| StorageError::unavailable(EntityKind::Lease, key, e))
    }
}
