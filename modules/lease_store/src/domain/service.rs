use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::contract::model::{
    Entity, EntityKind, Lease, NewLease, NewResource, NewUser, Resource, User,
};
use crate::domain::clock::Clock;
use crate::domain::error::DomainError;
use crate::domain::repo::LeaseStorage;
use crate::domain::validation;

/// Domain service with business rules for users, resources and leases.
/// Depends only on the storage port, not on backend types.
#[derive(Clone)]
pub struct Service {
    storage: Arc<dyn LeaseStorage>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Check that a lease's user and resource exist before writing it.
    pub enforce_references: bool,
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(storage: Arc<dyn LeaseStorage>, clock: Arc<dyn Clock>, config: ServiceConfig) -> Self {
        Self {
            storage,
            clock,
            config,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.storage.name()
    }

    /// Stored timestamps carry millisecond precision; stamp with the same.
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(3)
    }

    #[instrument(
        name = "lease_store.service.put",
        skip(self, entity),
        fields(kind = %entity.kind(), id = %entity.id())
    )]
    pub async fn put(&self, entity: Entity) -> Result<Entity, DomainError> {
        match entity {
            Entity::User(u) => self.put_user(u).await.map(Entity::User),
            Entity::Resource(r) => self.put_resource(r).await.map(Entity::Resource),
            Entity::Lease(l) => self.put_lease(l).await.map(Entity::Lease),
        }
    }

    #[instrument(name = "lease_store.service.get", skip(self), fields(kind = %kind, id = %id))]
    pub async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Entity, DomainError> {
        debug!("Getting entity by id");
        if id.is_nil() {
            return Err(DomainError::validation("id", "id cannot be empty"));
        }
        self.storage
            .get(kind, id)
            .await?
            .ok_or_else(|| DomainError::not_found(kind, id))
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, DomainError> {
        self.get(EntityKind::User, id)
            .await?
            .into_user()
            .ok_or_else(|| DomainError::not_found(EntityKind::User, id))
    }

    pub async fn get_resource(&self, id: Uuid) -> Result<Resource, DomainError> {
        self.get(EntityKind::Resource, id)
            .await?
            .into_resource()
            .ok_or_else(|| DomainError::not_found(EntityKind::Resource, id))
    }

    pub async fn get_lease(&self, id: Uuid) -> Result<Lease, DomainError> {
        self.get(EntityKind::Lease, id)
            .await?
            .into_lease()
            .ok_or_else(|| DomainError::not_found(EntityKind::Lease, id))
    }

    #[instrument(name = "lease_store.service.get_user_by_email", skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<User, DomainError> {
        debug!("Resolving user through email index");
        validation::validate_email(email)?;
        self.storage
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| DomainError::user_email_not_found(email))
    }

    #[instrument(name = "lease_store.service.list_leases_by_user", skip(self), fields(user_id = %user_id))]
    pub async fn list_leases_by_user(&self, user_id: Uuid) -> Result<Vec<Lease>, DomainError> {
        if user_id.is_nil() {
            return Err(DomainError::validation("user_id", "user id cannot be empty"));
        }
        let leases = self.storage.list_leases_by_user(user_id).await?;
        debug!("Found {} leases for user", leases.len());
        Ok(leases)
    }

    #[instrument(
        name = "lease_store.service.list_leases_by_resource",
        skip(self),
        fields(resource_id = %resource_id)
    )]
    pub async fn list_leases_by_resource(
        &self,
        resource_id: Uuid,
    ) -> Result<Vec<Lease>, DomainError> {
        if resource_id.is_nil() {
            return Err(DomainError::validation(
                "resource_id",
                "resource id cannot be empty",
            ));
        }
        let leases = self.storage.list_leases_by_resource(resource_id).await?;
        debug!("Found {} leases for resource", leases.len());
        Ok(leases)
    }

    #[instrument(name = "lease_store.service.delete_lease", skip(self), fields(lease_id = %id))]
    pub async fn delete_lease(&self, id: Uuid) -> Result<(), DomainError> {
        if id.is_nil() {
            return Err(DomainError::validation("id", "lease id cannot be empty"));
        }
        if self.storage.delete_lease(id).await? {
            info!("Deleted lease");
        } else {
            debug!("Lease already absent, nothing to delete");
        }
        Ok(())
    }

    #[instrument(
        name = "lease_store.service.create_user",
        skip(self),
        fields(email = %new_user.email, display_name = %new_user.display_name)
    )]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating new user");
        let user = User {
            id: Uuid::nil(),
            display_name: new_user.display_name,
            email: new_user.email,
            created_at: self.now(),
        };
        let user = self.put_user(user).await?;
        info!("Successfully created user with id={}", user.id);
        Ok(user)
    }

    #[instrument(name = "lease_store.service.create_resource", skip(self), fields(name = %new_resource.name))]
    pub async fn create_resource(&self, new_resource: NewResource) -> Result<Resource, DomainError> {
        info!("Creating new resource");
        let resource = Resource {
            id: Uuid::nil(),
            name: new_resource.name,
            created_at: self.now(),
        };
        let resource = self.put_resource(resource).await?;
        info!("Successfully created resource with id={}", resource.id);
        Ok(resource)
    }

    #[instrument(
        name = "lease_store.service.create_lease",
        skip(self),
        fields(user_id = %new_lease.user_id, resource_id = %new_lease.resource_id)
    )]
    pub async fn create_lease(&self, new_lease: NewLease) -> Result<Lease, DomainError> {
        info!("Creating new lease");
        let lease = Lease {
            id: Uuid::nil(),
            user_id: new_lease.user_id,
            resource_id: new_lease.resource_id,
            reason: new_lease.reason,
            duration: new_lease.duration,
            last_touched: self.now(),
            created_at: self.now(),
            approver: Uuid::nil(),
        };
        let lease = self.put_lease(lease).await?;
        info!(
            "Successfully created lease with id={} expiring at {}",
            lease.id,
            lease.expires_at()
        );
        Ok(lease)
    }

    #[instrument(name = "lease_store.service.touch_lease", skip(self), fields(lease_id = %id))]
    pub async fn touch_lease(&self, id: Uuid) -> Result<Lease, DomainError> {
        let lease = self.get_lease(id).await?;
        let lease = self.put_lease(lease).await?;
        debug!("Lease now expires at {}", lease.expires_at());
        Ok(lease)
    }

    #[instrument(
        name = "lease_store.service.approve_lease",
        skip(self),
        fields(lease_id = %id, approver = %approver)
    )]
    pub async fn approve_lease(&self, id: Uuid, approver: Uuid) -> Result<Lease, DomainError> {
        if approver.is_nil() {
            return Err(DomainError::validation(
                "approver",
                "approver id cannot be empty",
            ));
        }
        let mut lease = self.get_lease(id).await?;
        lease.approver = approver;
        let lease = self.put_lease(lease).await?;
        info!("Lease approved");
        Ok(lease)
    }

    // --- typed writes: validate, stamp server-assigned fields, persist ---

    async fn put_user(&self, mut user: User) -> Result<User, DomainError> {
        validation::validate_user(&user)?;
        let now = self.now();
        let previous = self.existing(EntityKind::User, user.id).await?;

        // At most one user per email: a mapping owned by another id is rejected.
        if let Some(owner) = self.storage.get_user_by_email(&user.email).await? {
            if owner.id != user.id {
                return Err(DomainError::validation(
                    "email",
                    format!("email '{}' is already registered", user.email),
                ));
            }
        }

        if user.id.is_nil() {
            user.id = Uuid::new_v4();
        }
        user.created_at = previous.map_or(now, |e| e.created_at());

        self.storage.put(&Entity::User(user.clone())).await?;
        Ok(user)
    }

    async fn put_resource(&self, mut resource: Resource) -> Result<Resource, DomainError> {
        validation::validate_resource(&resource)?;
        let now = self.now();
        let previous = self.existing(EntityKind::Resource, resource.id).await?;

        if resource.id.is_nil() {
            resource.id = Uuid::new_v4();
        }
        resource.created_at = previous.map_or(now, |e| e.created_at());

        self.storage.put(&Entity::Resource(resource.clone())).await?;
        Ok(resource)
    }

    async fn put_lease(&self, mut lease: Lease) -> Result<Lease, DomainError> {
        validation::validate_lease(&lease)?;
        let now = self.now();

        let previous = self
            .existing(EntityKind::Lease, lease.id)
            .await?
            .and_then(Entity::into_lease);
        if let Some(prev) = &previous {
            // The hierarchical primary path is derived from these two fields.
            if prev.user_id != lease.user_id {
                return Err(DomainError::validation(
                    "user_id",
                    "user id is immutable once a lease is created",
                ));
            }
            if prev.resource_id != lease.resource_id {
                return Err(DomainError::validation(
                    "resource_id",
                    "resource id is immutable once a lease is created",
                ));
            }
        }

        if self.config.enforce_references {
            self.check_references(&lease).await?;
        }

        if lease.id.is_nil() {
            lease.id = Uuid::new_v4();
        }
        lease.created_at = previous.map_or(now, |p| p.created_at);
        lease.last_touched = now;
        validation::validate_expiry(&lease)?;

        self.storage.put(&Entity::Lease(lease.clone())).await?;
        Ok(lease)
    }

    async fn existing(&self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, DomainError> {
        if id.is_nil() {
            return Ok(None);
        }
        Ok(self.storage.get(kind, id).await?)
    }

    async fn check_references(&self, lease: &Lease) -> Result<(), DomainError> {
        if self
            .storage
            .get(EntityKind::User, lease.user_id)
            .await?
            .is_none()
        {
            return Err(DomainError::validation(
                "user_id",
                format!("user {} does not exist", lease.user_id),
            ));
        }
        if self
            .storage
            .get(EntityKind::Resource, lease.resource_id)
            .await?
            .is_none()
        {
            return Err(DomainError::validation(
                "resource_id",
                format!("resource {} does not exist", lease.resource_id),
            ));
        }
        Ok(())
    }
}
