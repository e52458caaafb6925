//! Tests to verify that the service layer runs cleanly under a tracing subscriber

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use tracing_test::traced_test;
use uuid::Uuid;

use lease_store::contract::{EntityKind, NewLease, NewResource, NewUser};
use lease_store::domain::error::DomainError;
use lease_store::domain::service::{Service, ServiceConfig};
use lease_store::infra::storage::{HierarchicalStore, MemoryPathKv};
use lease_store::ManualClock;

fn service() -> Service {
    let kv = Arc::new(MemoryPathKv::new());
    let store = Arc::new(HierarchicalStore::new(kv));
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    Service::new(store, clock, ServiceConfig::default())
}

#[traced_test]
#[tokio::test]
async fn create_user_emits_spans() {
    let service = service();

    let result = service
        .create_user(NewUser {
            display_name: "John Doe".to_string(),
            email: "john@x.com".to_string(),
        })
        .await;

    assert!(result.is_ok());
    assert!(logs_contain("Successfully created user"));
}

#[traced_test]
#[tokio::test]
async fn lease_lifecycle_emits_spans() {
    let service = service();
    let resource = service
        .create_resource(NewResource {
            name: "sensitive-service".to_string(),
        })
        .await
        .unwrap();

    let lease = service
        .create_lease(NewLease {
            user_id: Uuid::new_v4(),
            resource_id: resource.id,
            reason: "debug".to_string(),
            duration: Duration::hours(3),
        })
        .await
        .unwrap();

    assert!(service.touch_lease(lease.id).await.is_ok());
    assert!(service.get(EntityKind::Lease, lease.id).await.is_ok());
    assert_eq!(
        service
            .list_leases_by_resource(resource.id)
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(service.delete_lease(lease.id).await.is_ok());
    // Second delete takes the "already absent" path.
    assert!(service.delete_lease(lease.id).await.is_ok());
}

#[traced_test]
#[tokio::test]
async fn failed_lookup_emits_spans() {
    let service = service();

    let result = service.get_user_by_email("nobody@x.com").await;

    assert!(matches!(result, Err(DomainError::NotFound { .. })), "{result:?}");
    assert!(logs_contain("Resolving user through email index"));
}
