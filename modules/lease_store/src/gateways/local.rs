use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::{
    client::LeaseStoreApi,
    error::LeaseStoreError,
    model::{Entity, EntityKind, Lease, NewLease, NewResource, NewUser, Resource, User},
};
use crate::domain::service::Service;

/// Local implementation of the LeaseStoreApi trait that delegates to the domain service
pub struct LeaseStoreLocalClient {
    service: Arc<Service>,
}

impl LeaseStoreLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LeaseStoreApi for LeaseStoreLocalClient {
    async fn put(&self, entity: Entity) -> Result<Entity, LeaseStoreError> {
        self.service.put(entity).await.map_err(Into::into)
    }

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Entity, LeaseStoreError> {
        self.service.get(kind, id).await.map_err(Into::into)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, LeaseStoreError> {
        self.service
            .get_user_by_email(email)
            .await
            .map_err(Into::into)
    }

    async fn list_leases_by_user(&self, user_id: Uuid) -> Result<Vec<Lease>, LeaseStoreError> {
        self.service
            .list_leases_by_user(user_id)
            .await
            .map_err(Into::into)
    }

    async fn list_leases_by_resource(
        &self,
        resource_id: Uuid,
    ) -> Result<Vec<Lease>, LeaseStoreError> {
        self.service
            .list_leases_by_resource(resource_id)
            .await
            .map_err(Into::into)
    }

    async fn delete_lease(&self, id: Uuid) -> Result<(), LeaseStoreError> {
        self.service.delete_lease(id).await.map_err(Into::into)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, LeaseStoreError> {
        self.service.create_user(new_user).await.map_err(Into::into)
    }

    async fn create_resource(
        &self,
        new_resource: NewResource,
    ) -> Result<Resource, LeaseStoreError> {
        self.service
            .create_resource(new_resource)
            .await
            .map_err(Into::into)
    }

    async fn create_lease(&self, new_lease: NewLease) -> Result<Lease, LeaseStoreError> {
        self.service.create_lease(new_lease).await.map_err(Into::into)
    }

    async fn touch_lease(&self, id: Uuid) -> Result<Lease, LeaseStoreError> {
        self.service.touch_lease(id).await.map_err(Into::into)
    }

    async fn approve_lease(&self, id: Uuid, approver: Uuid) -> Result<Lease, LeaseStoreError> {
        self.service
            .approve_lease(id, approver)
            .await
            .map_err(Into::into)
    }
}
