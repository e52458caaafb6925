use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    error::LeaseStoreError,
    model::{Entity, EntityKind, Lease, NewLease, NewResource, NewUser, Resource, User},
};

/// Public API of the lease store that HTTP/CLI adapters call into.
///
/// Every call is independent; implementations hold no per-caller state and
/// never retry a failed backend call.
#[async_trait]
pub trait LeaseStoreApi: Send + Sync {
    /// Validate, stamp server-assigned fields and persist any entity.
    /// Overwrites when the id already exists.
    async fn put(&self, entity: Entity) -> Result<Entity, LeaseStoreError>;

    /// Load an entity by kind and id
    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Entity, LeaseStoreError>;

    /// Look a user up through the unique email index
    async fn get_user_by_email(&self, email: &str) -> Result<User, LeaseStoreError>;

    /// All leases granted to a user
    async fn list_leases_by_user(&self, user_id: Uuid) -> Result<Vec<Lease>, LeaseStoreError>;

    /// All leases granted on a resource
    async fn list_leases_by_resource(
        &self,
        resource_id: Uuid,
    ) -> Result<Vec<Lease>, LeaseStoreError>;

    /// Remove a lease and all its index entries. Absent ids are not an error.
    async fn delete_lease(&self, id: Uuid) -> Result<(), LeaseStoreError>;

    async fn create_user(&self, new_user: NewUser) -> Result<User, LeaseStoreError>;

    async fn create_resource(&self, new_resource: NewResource)
        -> Result<Resource, LeaseStoreError>;

    async fn create_lease(&self, new_lease: NewLease) -> Result<Lease, LeaseStoreError>;

    /// Re-write a lease so that its expiry is measured from now
    async fn touch_lease(&self, id: Uuid) -> Result<Lease, LeaseStoreError>;

    /// Record who approved a lease. Approval also touches the lease.
    async fn approve_lease(&self, id: Uuid, approver: Uuid) -> Result<Lease, LeaseStoreError>;
}
