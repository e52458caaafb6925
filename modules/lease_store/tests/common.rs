#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use lease_store::config::{BackendKind, LeaseStoreConfig};
use lease_store::contract::{Lease, LeaseStoreApi, NewLease, NewResource, NewUser, User};
use lease_store::{Clock, LeaseStoreModule, ManualClock};

/// Index lag configured for the single-table backend in tests.
pub const INDEX_DELAY_MS: u64 = 250;

pub fn backends() -> [BackendKind; 2] {
    [BackendKind::Hierarchical, BackendKind::SingleTable]
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn config(backend: BackendKind) -> LeaseStoreConfig {
    LeaseStoreConfig {
        backend,
        index_propagation_delay: match backend {
            BackendKind::Hierarchical => StdDuration::ZERO,
            BackendKind::SingleTable => StdDuration::from_millis(INDEX_DELAY_MS),
        },
        ..LeaseStoreConfig::default()
    }
}

/// One wired store over a manual clock.
pub struct Harness {
    pub backend: BackendKind,
    pub clock: Arc<ManualClock>,
    pub module: LeaseStoreModule,
    pub client: Arc<dyn LeaseStoreApi>,
}

pub fn harness(backend: BackendKind) -> Harness {
    harness_with(config(backend))
}

pub fn harness_with(config: LeaseStoreConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let module = LeaseStoreModule::init(&config, clock.clone()).expect("module init");
    let client = module.client();
    Harness {
        backend: config.backend,
        clock,
        module,
        client,
    }
}

pub enum Listing {
    ByUser(Uuid),
    ByResource(Uuid),
}

impl Harness {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Longest time an index read may lag behind a write on this backend.
    pub fn propagation_window(&self) -> Duration {
        match self.backend {
            BackendKind::Hierarchical => Duration::zero(),
            BackendKind::SingleTable => Duration::milliseconds(4 * INDEX_DELAY_MS as i64),
        }
    }

    /// Poll a listing until `done` accepts it, advancing the clock in small
    /// steps. Panics once the propagation window is exhausted.
    pub async fn list_eventually(
        &self,
        listing: Listing,
        done: impl Fn(&[Lease]) -> bool,
    ) -> Vec<Lease> {
        let step = Duration::milliseconds(50);
        let mut waited = Duration::zero();
        loop {
            let leases = match listing {
                Listing::ByUser(id) => self.client.list_leases_by_user(id).await,
                Listing::ByResource(id) => self.client.list_leases_by_resource(id).await,
            }
            .expect("listing");
            if done(&leases) {
                return leases;
            }
            assert!(
                waited < self.propagation_window(),
                "{:?}: listing did not converge within {}",
                self.backend,
                self.propagation_window()
            );
            self.clock.advance(step);
            waited += step;
        }
    }

    /// Poll the email index until it resolves.
    pub async fn user_by_email_eventually(&self, email: &str) -> User {
        let step = Duration::milliseconds(50);
        let mut waited = Duration::zero();
        loop {
            if let Ok(user) = self.client.get_user_by_email(email).await {
                return user;
            }
            assert!(
                waited < self.propagation_window(),
                "{:?}: email {email} did not resolve",
                self.backend
            );
            self.clock.advance(step);
            waited += step;
        }
    }

    pub async fn user(&self, display_name: &str, email: &str) -> User {
        self.client
            .create_user(NewUser {
                display_name: display_name.to_owned(),
                email: email.to_owned(),
            })
            .await
            .expect("create user")
    }

    pub async fn resource(&self, name: &str) -> lease_store::contract::Resource {
        self.client
            .create_resource(NewResource {
                name: name.to_owned(),
            })
            .await
            .expect("create resource")
    }

    pub async fn lease(&self, user_id: Uuid, resource_id: Uuid, duration: Duration) -> Lease {
        self.client
            .create_lease(NewLease {
                user_id,
                resource_id,
                reason: "debug".to_owned(),
                duration,
            })
            .await
            .expect("create lease")
    }
}
