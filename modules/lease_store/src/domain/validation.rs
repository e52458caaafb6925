use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;
use thiserror::Error;

use crate::contract::model::{Entity, Lease, Resource, User};

/// Longest lease accepted on write: one hundred years of whole seconds.
pub const MAX_LEASE_DURATION_SECS: i64 = 100 * 365 * 24 * 60 * 60;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+$").expect("email pattern is a valid regex"));

/// Rejected input, carrying the offending field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Run the write-time rules for any entity. Nothing may be persisted when this fails.
pub fn validate(entity: &Entity) -> Result<(), ValidationError> {
    match entity {
        Entity::User(u) => validate_user(u),
        Entity::Resource(r) => validate_resource(r),
        Entity::Lease(l) => validate_lease(l),
    }
}

pub fn validate_user(user: &User) -> Result<(), ValidationError> {
    if user.display_name.is_empty() {
        return Err(ValidationError::new(
            "display_name",
            "display name cannot be empty",
        ));
    }
    validate_email(&user.email)
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::new("email", "email cannot be empty"));
    }
    if !EMAIL_SHAPE.is_match(email) {
        return Err(ValidationError::new(
            "email",
            format!("invalid email format: '{email}'"),
        ));
    }
    Ok(())
}

pub fn validate_resource(resource: &Resource) -> Result<(), ValidationError> {
    if resource.name.is_empty() {
        return Err(ValidationError::new("name", "name cannot be empty"));
    }
    Ok(())
}

pub fn validate_lease(lease: &Lease) -> Result<(), ValidationError> {
    if lease.user_id.is_nil() {
        return Err(ValidationError::new("user_id", "user id cannot be empty"));
    }
    if lease.resource_id.is_nil() {
        return Err(ValidationError::new(
            "resource_id",
            "resource id cannot be empty",
        ));
    }
    if lease.reason.is_empty() {
        return Err(ValidationError::new("reason", "reason cannot be empty"));
    }
    // Stored as whole seconds, so anything under one second would persist as zero.
    if lease.duration < Duration::seconds(1) {
        return Err(ValidationError::new(
            "duration",
            format!(
                "duration must be a positive number of seconds, got {}ms",
                lease.duration.num_milliseconds()
            ),
        ));
    }
    if lease.duration > Duration::seconds(MAX_LEASE_DURATION_SECS) {
        return Err(ValidationError::new(
            "duration",
            format!(
                "duration must not exceed {} seconds, got {}",
                MAX_LEASE_DURATION_SECS,
                lease.duration.num_seconds()
            ),
        ));
    }
    validate_expiry(lease)
}

/// The derived expiry must be representable.
pub fn validate_expiry(lease: &Lease) -> Result<(), ValidationError> {
    if lease.last_touched.checked_add_signed(lease.duration).is_none() {
        return Err(ValidationError::new(
            "duration",
            "last_touched + duration is out of range",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn user(display_name: &str, email: &str) -> User {
        User {
            id: Uuid::nil(),
            display_name: display_name.to_owned(),
            email: email.to_owned(),
            created_at: Utc::now(),
        }
    }

    fn lease(reason: &str, duration: Duration) -> Lease {
        Lease {
            id: Uuid::nil(),
            user_id: Uuid::new_v4(),
            resource_id: Uuid::new_v4(),
            reason: reason.to_owned(),
            duration,
            last_touched: Utc::now(),
            created_at: Utc::now(),
            approver: Uuid::nil(),
        }
    }

    #[test]
    fn accepts_well_formed_user() {
        assert!(validate_user(&user("John Doe", "john@x.com")).is_ok());
    }

    #[test]
    fn rejects_empty_display_name() {
        let err = validate_user(&user("", "john@x.com")).unwrap_err();
        assert_eq!(err.field, "display_name");
    }

    #[test]
    fn rejects_malformed_emails() {
        for email in ["", "not-an-email", "a@b@c", "@x.com", "john@"] {
            let err = validate_user(&user("John", email)).unwrap_err();
            assert_eq!(err.field, "email", "{email} should be rejected");
        }
    }

    #[test]
    fn rejects_empty_resource_name() {
        let resource = Resource {
            id: Uuid::nil(),
            name: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(validate_resource(&resource).unwrap_err().field, "name");
    }

    #[test]
    fn rejects_bad_leases() {
        assert_eq!(
            validate_lease(&lease("", Duration::hours(1)))
                .unwrap_err()
                .field,
            "reason"
        );
        for duration in [
            Duration::zero(),
            Duration::seconds(-5),
            Duration::milliseconds(500),
            Duration::seconds(MAX_LEASE_DURATION_SECS + 1),
            Duration::days(1_000_000_000),
        ] {
            let err = validate_lease(&lease("debug", duration)).unwrap_err();
            assert_eq!(err.field, "duration");
        }

        let mut no_user = lease("debug", Duration::hours(1));
        no_user.user_id = Uuid::nil();
        assert_eq!(validate_lease(&no_user).unwrap_err().field, "user_id");

        let mut no_resource = lease("debug", Duration::hours(1));
        no_resource.resource_id = Uuid::nil();
        assert_eq!(
            validate_lease(&no_resource).unwrap_err().field,
            "resource_id"
        );
    }

    #[test]
    fn accepts_duration_bounds() {
        assert!(validate_lease(&lease("debug", Duration::seconds(1))).is_ok());
        assert!(
            validate_lease(&lease("debug", Duration::seconds(MAX_LEASE_DURATION_SECS))).is_ok()
        );
    }

    #[test]
    fn rejects_unrepresentable_expiry() {
        let mut near_end = lease("debug", Duration::hours(1));
        near_end.last_touched = DateTime::<Utc>::MAX_UTC - Duration::minutes(1);
        assert_eq!(validate_lease(&near_end).unwrap_err().field, "duration");
        assert_eq!(validate_expiry(&near_end).unwrap_err().field, "duration");
    }

    #[test]
    fn validate_dispatches_on_entity_variant() {
        let entity = Entity::Lease(lease("debug", Duration::hours(3)));
        assert!(validate(&entity).is_ok());
        let entity = Entity::User(user("x", "bad"));
        assert_eq!(validate(&entity).unwrap_err().field, "email");
    }
}
