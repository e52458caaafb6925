//! Persisted record layout for the hierarchical store.
//!
//! Records are JSON documents tagged by `item_type`. Ids are key fragments,
//! timestamps epoch milliseconds and durations whole seconds. `expires_at` is
//! written for external readers and recomputed on decode.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contract::model::{Entity, EntityKind, Lease, Resource, User};
use crate::domain::codec::{self, CodecError};

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad field encoding: {0}")]
    Codec(#[from] CodecError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "item_type")]
pub enum Record {
    User(UserRecord),
    Resource(ResourceRecord),
    Lease(LeaseRecord),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRecord {
    pub id: String,
    pub user_id: String,
    pub resource_id: String,
    pub reason: String,
    pub duration_seconds: i64,
    pub last_touched: i64,
    pub created_at: i64,
    #[serde(default)]
    pub approver: String,
    pub expires_at: i64,
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Resource(_) => EntityKind::Resource,
            Self::Lease(_) => EntityKind::Lease,
        }
    }

    pub fn from_entity(entity: &Entity) -> Self {
        match entity {
            Entity::User(u) => Self::User(UserRecord {
                id: codec::encode_id(u.id),
                display_name: u.display_name.clone(),
                email: u.email.clone(),
                created_at: codec::encode_timestamp(u.created_at),
            }),
            Entity::Resource(r) => Self::Resource(ResourceRecord {
                id: codec::encode_id(r.id),
                name: r.name.clone(),
                created_at: codec::encode_timestamp(r.created_at),
            }),
            Entity::Lease(l) => Self::Lease(LeaseRecord {
                id: codec::encode_id(l.id),
                user_id: codec::encode_id(l.user_id),
                resource_id: codec::encode_id(l.resource_id),
                reason: l.reason.clone(),
                duration_seconds: codec::encode_duration(l.duration),
                last_touched: codec::encode_timestamp(l.last_touched),
                created_at: codec::encode_timestamp(l.created_at),
                approver: if l.approver.is_nil() {
                    String::new()
                } else {
                    codec::encode_id(l.approver)
                },
                expires_at: codec::encode_timestamp(l.expires_at()),
            }),
        }
    }

    pub fn into_entity(self) -> Result<Entity, CodecError> {
        Ok(match self {
            Self::User(r) => Entity::User(User {
                id: codec::decode_id(&r.id)?,
                display_name: r.display_name,
                email: r.email,
                created_at: codec::decode_timestamp(r.created_at)?,
            }),
            Self::Resource(r) => Entity::Resource(Resource {
                id: codec::decode_id(&r.id)?,
                name: r.name,
                created_at: codec::decode_timestamp(r.created_at)?,
            }),
            Self::Lease(r) => Entity::Lease(Lease {
                id: codec::decode_id(&r.id)?,
                user_id: codec::decode_id(&r.user_id)?,
                resource_id: codec::decode_id(&r.resource_id)?,
                reason: r.reason,
                duration: codec::decode_duration(r.duration_seconds)?,
                last_touched: codec::decode_timestamp(r.last_touched)?,
                created_at: codec::decode_timestamp(r.created_at)?,
                approver: codec::decode_id(&r.approver)?,
            }),
        })
    }
}

pub fn encode(entity: &Entity) -> Result<Vec<u8>, RecordError> {
    Ok(serde_json::to_vec(&Record::from_entity(entity))?)
}

pub fn decode(payload: &[u8]) -> Result<Entity, RecordError> {
    let record: Record = serde_json::from_slice(payload)?;
    Ok(record.into_entity()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn lease_record_layout() {
        let touched = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let lease = Lease {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            resource_id: Uuid::new_v4(),
            reason: "debug".to_owned(),
            duration: Duration::hours(3),
            last_touched: touched,
            created_at: touched,
            approver: Uuid::nil(),
        };
        let json: serde_json::Value =
            serde_json::from_slice(&encode(&Entity::Lease(lease.clone())).unwrap()).unwrap();

        assert_eq!(json["item_type"], "Lease");
        assert_eq!(json["duration_seconds"], 10_800);
        assert_eq!(json["last_touched"], 1_700_000_000_000_i64);
        assert_eq!(json["expires_at"], 1_700_010_800_000_i64);
        assert_eq!(json["approver"], "");
        assert_eq!(json["id"], codec::encode_id(lease.id));
    }

    #[test]
    fn missing_approver_decodes_as_pending() {
        let id = codec::encode_id(Uuid::new_v4());
        let payload = serde_json::json!({
            "item_type": "Lease",
            "id": id,
            "user_id": codec::encode_id(Uuid::new_v4()),
            "resource_id": codec::encode_id(Uuid::new_v4()),
            "reason": "debug",
            "duration_seconds": 60,
            "last_touched": 0,
            "created_at": 0,
            "expires_at": 60_000
        });
        let entity = decode(&serde_json::to_vec(&payload).unwrap()).unwrap();
        let lease = entity.into_lease().unwrap();
        assert!(lease.is_pending());
        assert_eq!(lease.expires_at().timestamp_millis(), 60_000);
    }

    #[test]
    fn unknown_item_type_is_rejected() {
        let payload = br#"{"item_type":"Widget","id":""}"#;
        assert!(matches!(decode(payload), Err(RecordError::Json(_))));
    }

    #[test]
    fn bad_id_fragment_is_a_codec_error() {
        let payload = br#"{"item_type":"Resource","id":"nope","name":"x","created_at":0}"#;
        assert!(matches!(decode(payload), Err(RecordError::Codec(_))));
    }
}
