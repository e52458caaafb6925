//! Key/index scheme.
//!
//! Every entity is reachable by its primary id; leases are also enumerable by
//! user and by resource, and users by email. The scheme has two encodings:
//!
//! - flat keys (`user:{id}`, `lease:{id}`, ...) plus explicit secondary-index
//!   keys written as attributes of the same item;
//! - hierarchical key paths that embed the foreign keys, so that a prefix
//!   scan over `/user-{user_id}/res-` is the "leases by user" index.
//!
//! All functions here are pure; ids are rendered with [`encode_id`].

use uuid::Uuid;

use crate::contract::model::{Entity, EntityKind};
use crate::domain::codec::encode_id;

/// Secondary indexes of the flat encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexName {
    LeasesByUser,
    LeasesByResource,
    UserByEmail,
}

impl IndexName {
    pub const ALL: [IndexName; 3] = [
        IndexName::LeasesByUser,
        IndexName::LeasesByResource,
        IndexName::UserByEmail,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeasesByUser => "GSI1",
            Self::LeasesByResource => "GSI2",
            Self::UserByEmail => "GSI3",
        }
    }

    /// Attribute carrying the index partition key on an item.
    pub fn partition_attribute(self) -> &'static str {
        match self {
            Self::LeasesByUser => "GSI1PK",
            Self::LeasesByResource => "GSI2PK",
            Self::UserByEmail => "GSI3PK",
        }
    }

    pub fn sort_attribute(self) -> Option<&'static str> {
        match self {
            Self::LeasesByUser => Some("GSI1SK"),
            Self::LeasesByResource => Some("GSI2SK"),
            Self::UserByEmail => None,
        }
    }
}

/// One secondary-index projection of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    pub index: IndexName,
    pub partition: String,
    pub sort: Option<String>,
}

/// Flat-encoding keys of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityKeys {
    pub primary: String,
    pub indexes: Vec<IndexKey>,
}

pub fn user_key(id: Uuid) -> String {
    format!("user:{}", encode_id(id))
}

pub fn resource_key(id: Uuid) -> String {
    format!("res:{}", encode_id(id))
}

pub fn lease_key(id: Uuid) -> String {
    format!("lease:{}", encode_id(id))
}

pub fn email_key(email: &str) -> String {
    format!("email:{email}")
}

pub fn primary_key(kind: EntityKind, id: Uuid) -> String {
    match kind {
        EntityKind::User => user_key(id),
        EntityKind::Resource => resource_key(id),
        EntityKind::Lease => lease_key(id),
    }
}

/// Primary key and index projections for the flat encoding.
pub fn entity_keys(entity: &Entity) -> EntityKeys {
    match entity {
        Entity::User(u) => EntityKeys {
            primary: user_key(u.id),
            indexes: vec![IndexKey {
                index: IndexName::UserByEmail,
                partition: email_key(&u.email),
                sort: None,
            }],
        },
        Entity::Resource(r) => EntityKeys {
            primary: resource_key(r.id),
            indexes: Vec::new(),
        },
        Entity::Lease(l) => {
            let primary = lease_key(l.id);
            EntityKeys {
                indexes: vec![
                    IndexKey {
                        index: IndexName::LeasesByUser,
                        partition: user_key(l.user_id),
                        sort: Some(primary.clone()),
                    },
                    IndexKey {
                        index: IndexName::LeasesByResource,
                        partition: resource_key(l.resource_id),
                        sort: Some(primary.clone()),
                    },
                ],
                primary,
            }
        }
    }
}

// --- hierarchical encoding ---

pub fn user_path(id: Uuid) -> String {
    format!("/user-{}", encode_id(id))
}

pub fn user_email_path(email: &str) -> String {
    format!("/user_email-{email}")
}

pub fn resource_path(id: Uuid) -> String {
    format!("/res-{}", encode_id(id))
}

pub fn lease_path(id: Uuid) -> String {
    format!("/lease-{}", encode_id(id))
}

pub fn lease_user_path(user_id: Uuid, resource_id: Uuid, id: Uuid) -> String {
    format!(
        "/user-{}/res-{}/lease-{}",
        encode_id(user_id),
        encode_id(resource_id),
        encode_id(id)
    )
}

pub fn lease_resource_path(resource_id: Uuid, id: Uuid) -> String {
    format!("/res-{}/lease-{}", encode_id(resource_id), encode_id(id))
}

/// Scan prefix covering every lease of a user (and nothing else).
pub fn leases_by_user_prefix(user_id: Uuid) -> String {
    format!("/user-{}/res-", encode_id(user_id))
}

/// Scan prefix covering every lease on a resource (and nothing else).
pub fn leases_by_resource_prefix(resource_id: Uuid) -> String {
    format!("/res-{}/lease-", encode_id(resource_id))
}

/// The alias path that reaches an entity by id alone.
pub fn id_path(kind: EntityKind, id: Uuid) -> String {
    match kind {
        EntityKind::User => user_path(id),
        EntityKind::Resource => resource_path(id),
        EntityKind::Lease => lease_path(id),
    }
}

/// All key paths of an entity, primary first.
///
/// A lease's primary path is derived from `user_id` and `resource_id`, so it
/// can always be rebuilt from the lease's own fields.
pub fn key_paths(entity: &Entity) -> Vec<String> {
    match entity {
        Entity::User(u) => vec![user_path(u.id), user_email_path(&u.email)],
        Entity::Resource(r) => vec![resource_path(r.id)],
        Entity::Lease(l) => vec![
            lease_user_path(l.user_id, l.resource_id, l.id),
            lease_resource_path(l.resource_id, l.id),
            lease_path(l.id),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::{Lease, User};
    use chrono::{Duration, Utc};

    fn lease() -> Lease {
        Lease {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            resource_id: Uuid::new_v4(),
            reason: "debug".to_owned(),
            duration: Duration::hours(3),
            last_touched: Utc::now(),
            created_at: Utc::now(),
            approver: Uuid::nil(),
        }
    }

    #[test]
    fn lease_flat_keys_carry_both_indexes() {
        let l = lease();
        let keys = entity_keys(&Entity::Lease(l.clone()));
        assert_eq!(keys.primary, format!("lease:{}", encode_id(l.id)));
        assert_eq!(keys.indexes.len(), 2);
        assert_eq!(keys.indexes[0].index, IndexName::LeasesByUser);
        assert_eq!(keys.indexes[0].partition, user_key(l.user_id));
        assert_eq!(keys.indexes[1].index, IndexName::LeasesByResource);
        assert_eq!(keys.indexes[1].partition, resource_key(l.resource_id));
        assert!(keys
            .indexes
            .iter()
            .all(|k| k.sort.as_deref() == Some(keys.primary.as_str())));
    }

    #[test]
    fn user_flat_keys_index_email() {
        let u = User {
            id: Uuid::new_v4(),
            display_name: "John".to_owned(),
            email: "a@b.com".to_owned(),
            created_at: Utc::now(),
        };
        let keys = entity_keys(&Entity::User(u.clone()));
        assert_eq!(keys.primary, user_key(u.id));
        assert_eq!(keys.indexes[0].partition, "email:a@b.com");
        assert_eq!(keys.indexes[0].index.partition_attribute(), "GSI3PK");
    }

    #[test]
    fn lease_paths_fall_under_their_scan_prefixes() {
        let l = lease();
        let paths = key_paths(&Entity::Lease(l.clone()));
        assert_eq!(paths.len(), 3);
        assert!(paths[0].starts_with(&leases_by_user_prefix(l.user_id)));
        assert!(paths[1].starts_with(&leases_by_resource_prefix(l.resource_id)));
        assert_eq!(paths[2], id_path(EntityKind::Lease, l.id));
    }

    #[test]
    fn entity_paths_do_not_match_lease_prefixes() {
        let id = Uuid::new_v4();
        assert!(!user_path(id).starts_with(&leases_by_user_prefix(id)));
        assert!(!resource_path(id).starts_with(&leases_by_resource_prefix(id)));
        assert!(!user_email_path("x@y").starts_with("/user-"));
    }
}
