use thiserror::Error;

use crate::contract::model::EntityKind;

/// Errors that are safe to expose to other crates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaseStoreError {
    /// Bad input; the caller must not retry unchanged.
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{kind} not found: {key}")]
    NotFound { kind: EntityKind, key: String },

    /// Transport or infrastructure fault, surfaced without any retry.
    #[error("Backend unavailable for {kind} '{key}': {message}")]
    BackendUnavailable {
        kind: EntityKind,
        key: String,
        message: String,
    },

    /// Reserved for optimistic concurrency; writes are unconditional today.
    #[error("Conflicting write for {kind} '{key}'")]
    Conflict { kind: EntityKind, key: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LeaseStoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: EntityKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for faults a caller may reasonably retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}

impl From<crate::domain::error::DomainError> for LeaseStoreError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError;
        match domain_error {
            DomainError::Validation(v) => Self::Validation {
                field: v.field.to_owned(),
                message: v.message,
            },
            DomainError::NotFound { kind, key } => Self::NotFound { kind, key },
            DomainError::BackendUnavailable { kind, key, message } => {
                Self::BackendUnavailable { kind, key, message }
            }
            DomainError::Conflict { kind, key } => Self::Conflict { kind, key },
            DomainError::CorruptRecord { kind, key, message } => Self::Internal {
                message: format!("undecodable {kind} record at '{key}': {message}"),
            },
        }
    }
}
