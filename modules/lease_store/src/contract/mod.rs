pub mod client;
pub mod error;
pub mod model;

pub use client::LeaseStoreApi;
pub use error::LeaseStoreError;
pub use model::{Entity, EntityKind, Lease, NewLease, NewResource, NewUser, Resource, User};
