use std::fmt;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Pure user model for inter-crate communication (no serde)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A protected resource users can lease access to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Time-bounded grant of access from a user to a resource.
///
/// `user_id` and `resource_id` are references, not ownership: deleting the
/// referenced user or resource leaves the lease in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resource_id: Uuid,
    pub reason: String,
    /// Validity window measured from `last_touched`.
    pub duration: Duration,
    pub last_touched: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// `Uuid::nil()` while the lease is pending approval.
    pub approver: Uuid,
}

impl Lease {
    /// Derived expiry: `last_touched + duration`, saturating at the ends of the time range.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.last_touched
            .checked_add_signed(self.duration)
            .unwrap_or(if self.duration < Duration::zero() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }

    pub fn is_pending(&self) -> bool {
        self.approver.is_nil()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Data for creating a new user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub display_name: String,
    pub email: String,
}

/// Data for creating a new resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    pub name: String,
}

/// Data for creating a new lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLease {
    pub user_id: Uuid,
    pub resource_id: Uuid,
    pub reason: String,
    pub duration: Duration,
}

/// Discriminant of the closed set of persisted record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Resource,
    Lease,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Resource => "Resource",
            Self::Lease => "Lease",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any record the store can persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    User(User),
    Resource(Resource),
    Lease(Lease),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Resource(_) => EntityKind::Resource,
            Self::Lease(_) => EntityKind::Lease,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::User(u) => u.id,
            Self::Resource(r) => r.id,
            Self::Lease(l) => l.id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::User(u) => u.created_at,
            Self::Resource(r) => r.created_at,
            Self::Lease(l) => l.created_at,
        }
    }

    pub fn into_user(self) -> Option<User> {
        match self {
            Self::User(u) => Some(u),
            _ => None,
        }
    }

    pub fn into_resource(self) -> Option<Resource> {
        match self {
            Self::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_lease(self) -> Option<Lease> {
        match self {
            Self::Lease(l) => Some(l),
            _ => None,
        }
    }
}

impl From<User> for Entity {
    fn from(u: User) -> Self {
        Self::User(u)
    }
}

impl From<Resource> for Entity {
    fn from(r: Resource) -> Self {
        Self::Resource(r)
    }
}

impl From<Lease> for Entity {
    fn from(l: Lease) -> Self {
        Self::Lease(l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn lease_at(touched: DateTime<Utc>, duration: Duration) -> Lease {
        Lease {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            resource_id: Uuid::new_v4(),
            reason: "debug".to_owned(),
            duration,
            last_touched: touched,
            created_at: touched,
            approver: Uuid::nil(),
        }
    }

    #[test]
    fn expires_at_is_last_touched_plus_duration() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let lease = lease_at(t0, Duration::hours(3));
        assert_eq!(lease.expires_at(), t0 + Duration::hours(3));
        assert!(!lease.is_expired(t0 + Duration::hours(2)));
        assert!(lease.is_expired(t0 + Duration::hours(3)));
    }

    #[test]
    fn expires_at_saturates_instead_of_overflowing() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let lease = lease_at(t0, Duration::days(1_000_000_000));
        assert_eq!(lease.expires_at(), DateTime::<Utc>::MAX_UTC);
        assert!(!lease.is_expired(t0));

        let lease = lease_at(t0, Duration::days(-1_000_000_000));
        assert_eq!(lease.expires_at(), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn lease_is_pending_until_approver_is_set() {
        let mut lease = lease_at(Utc::now(), Duration::minutes(5));
        assert!(lease.is_pending());
        lease.approver = Uuid::new_v4();
        assert!(!lease.is_pending());
    }

    #[test]
    fn entity_dispatch_is_exhaustive() {
        let lease = lease_at(Utc::now(), Duration::seconds(1));
        let id = lease.id;
        let entity = Entity::from(lease);
        assert_eq!(entity.kind(), EntityKind::Lease);
        assert_eq!(entity.id(), id);
        assert!(entity.clone().into_user().is_none());
        assert_eq!(entity.into_lease().map(|l| l.id), Some(id));
        assert_eq!(EntityKind::Resource.to_string(), "Resource");
    }
}
