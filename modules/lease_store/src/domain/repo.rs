use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::{Entity, EntityKind, Lease, User};

/// Failure of a storage backend, with the entity kind and key involved.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Transport/infrastructure fault. Never retried inside the store.
    #[error("backend unavailable for {kind} at '{key}': {source:#}")]
    Unavailable {
        kind: EntityKind,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// A stored record could not be decoded.
    #[error("corrupt {kind} record at '{key}': {message}")]
    Corrupt {
        kind: EntityKind,
        key: String,
        message: String,
    },
}

impl StorageError {
    pub fn unavailable(kind: EntityKind, key: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Unavailable {
            kind,
            key: key.into(),
            source,
        }
    }

    pub fn corrupt(kind: EntityKind, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            kind,
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Port for the domain layer: the storage engine interface every backend realizes.
///
/// The domain service validates and stamps entities before calling `put`;
/// backends derive keys and persist the primary record together with its index
/// projections as one logical write.
#[async_trait]
pub trait LeaseStorage: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Persist a fully-formed entity, replacing any previous version with the same id.
    async fn put(&self, entity: &Entity) -> Result<(), StorageError>;

    /// Load an entity by kind and id.
    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, StorageError>;

    /// Resolve the unique email index.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    async fn list_leases_by_user(&self, user_id: Uuid) -> Result<Vec<Lease>, StorageError>;

    async fn list_leases_by_resource(&self, resource_id: Uuid)
        -> Result<Vec<Lease>, StorageError>;

    /// Delete a lease and its index projections. Returns true if it existed.
    async fn delete_lease(&self, id: Uuid) -> Result<bool, StorageError>;
}
