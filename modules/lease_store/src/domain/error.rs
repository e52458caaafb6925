use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::EntityKind;
use crate::domain::repo::StorageError;
use crate::domain::validation::ValidationError;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {key}")]
    NotFound { kind: EntityKind, key: String },

    #[error("Backend unavailable for {kind} '{key}': {message}")]
    BackendUnavailable {
        kind: EntityKind,
        key: String,
        message: String,
    },

    #[error("Conflicting write for {kind} '{key}'")]
    Conflict { kind: EntityKind, key: String },

    #[error("Corrupt {kind} record at '{key}': {message}")]
    CorruptRecord {
        kind: EntityKind,
        key: String,
        message: String,
    },
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(field, message))
    }

    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        Self::NotFound {
            kind,
            key: id.to_string(),
        }
    }

    pub fn user_email_not_found(email: &str) -> Self {
        Self::NotFound {
            kind: EntityKind::User,
            key: email.to_owned(),
        }
    }
}

impl From<StorageError> for DomainError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Unavailable { kind, key, source } => Self::BackendUnavailable {
                kind,
                key,
                message: format!("{source:#}"),
            },
            StorageError::Corrupt { kind, key, message } => {
                Self::CorruptRecord { kind, key, message }
            }
        }
    }
}
