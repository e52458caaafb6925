//! Attribute-map layout for the single-table backend.
//!
//! One item per entity: `PK` is the flat primary key, `SK` is the constant
//! `METADATA`, the index projections are extra string attributes on the same
//! item, and leases carry a numeric `expires_at` (epoch seconds) for native
//! expiry. Ids are raw 16-byte binaries; the nil approver is zero bytes.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::contract::model::{Entity, EntityKind, Lease, Resource, User};
use crate::domain::codec::{self, CodecError};
use crate::domain::keys;

pub const PARTITION_KEY: &str = "PK";
pub const SORT_KEY: &str = "SK";
pub const METADATA_SORT_KEY: &str = "METADATA";
pub const ITEM_TYPE: &str = "item_type";
pub const TTL_ATTRIBUTE: &str = "expires_at";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AttributeValue {
    S(String),
    N(i64),
    B(Vec<u8>),
}

pub type Item = BTreeMap<String, AttributeValue>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("missing attribute '{name}'")]
    MissingAttribute { name: &'static str },

    #[error("attribute '{name}' is not of type {expected}")]
    WrongType {
        name: &'static str,
        expected: &'static str,
    },

    #[error("unknown item_type '{found}'")]
    UnknownItemType { found: String },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub fn string_attr(item: &Item, name: &str) -> Option<String> {
    match item.get(name) {
        Some(AttributeValue::S(s)) => Some(s.clone()),
        _ => None,
    }
}

fn get_s(item: &Item, name: &'static str) -> Result<String, ItemError> {
    match item.get(name) {
        Some(AttributeValue::S(s)) => Ok(s.clone()),
        Some(_) => Err(ItemError::WrongType { name, expected: "S" }),
        None => Err(ItemError::MissingAttribute { name }),
    }
}

fn get_n(item: &Item, name: &'static str) -> Result<i64, ItemError> {
    match item.get(name) {
        Some(AttributeValue::N(n)) => Ok(*n),
        Some(_) => Err(ItemError::WrongType { name, expected: "N" }),
        None => Err(ItemError::MissingAttribute { name }),
    }
}

fn get_b<'a>(item: &'a Item, name: &'static str) -> Result<&'a [u8], ItemError> {
    match item.get(name) {
        Some(AttributeValue::B(b)) => Ok(b),
        Some(_) => Err(ItemError::WrongType { name, expected: "B" }),
        None => Err(ItemError::MissingAttribute { name }),
    }
}

fn s(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

/// Build the single item that carries an entity and all of its index keys.
pub fn entity_to_item(entity: &Entity) -> Item {
    let entity_keys = keys::entity_keys(entity);
    let mut item = Item::new();
    item.insert(PARTITION_KEY.to_owned(), s(entity_keys.primary));
    item.insert(SORT_KEY.to_owned(), s(METADATA_SORT_KEY));
    item.insert(ITEM_TYPE.to_owned(), s(entity.kind().as_str()));

    for index_key in entity_keys.indexes {
        item.insert(
            index_key.index.partition_attribute().to_owned(),
            s(index_key.partition),
        );
        if let (Some(attr), Some(sort)) = (index_key.index.sort_attribute(), index_key.sort) {
            item.insert(attr.to_owned(), s(sort));
        }
    }

    match entity {
        Entity::User(u) => {
            item.insert("id".to_owned(), AttributeValue::B(codec::id_to_bytes(u.id)));
            item.insert("display_name".to_owned(), s(u.display_name.as_str()));
            item.insert("email".to_owned(), s(u.email.as_str()));
            item.insert(
                "created_at".to_owned(),
                AttributeValue::N(codec::encode_timestamp(u.created_at)),
            );
        }
        Entity::Resource(r) => {
            item.insert("id".to_owned(), AttributeValue::B(codec::id_to_bytes(r.id)));
            item.insert("name".to_owned(), s(r.name.as_str()));
            item.insert(
                "created_at".to_owned(),
                AttributeValue::N(codec::encode_timestamp(r.created_at)),
            );
        }
        Entity::Lease(l) => {
            item.insert("id".to_owned(), AttributeValue::B(codec::id_to_bytes(l.id)));
            item.insert(
                "user_id".to_owned(),
                AttributeValue::B(codec::id_to_bytes(l.user_id)),
            );
            item.insert(
                "resource_id".to_owned(),
                AttributeValue::B(codec::id_to_bytes(l.resource_id)),
            );
            item.insert("reason".to_owned(), s(l.reason.as_str()));
            item.insert(
                "duration_seconds".to_owned(),
                AttributeValue::N(codec::encode_duration(l.duration)),
            );
            item.insert(
                "last_touched".to_owned(),
                AttributeValue::N(codec::encode_timestamp(l.last_touched)),
            );
            item.insert(
                "created_at".to_owned(),
                AttributeValue::N(codec::encode_timestamp(l.created_at)),
            );
            item.insert(
                "approver".to_owned(),
                AttributeValue::B(codec::optional_id_to_bytes(l.approver)),
            );
            item.insert(
                TTL_ATTRIBUTE.to_owned(),
                AttributeValue::N(codec::epoch_seconds(l.expires_at())),
            );
        }
    }
    item
}

pub fn item_kind(item: &Item) -> Result<EntityKind, ItemError> {
    match get_s(item, ITEM_TYPE)?.as_str() {
        "User" => Ok(EntityKind::User),
        "Resource" => Ok(EntityKind::Resource),
        "Lease" => Ok(EntityKind::Lease),
        other => Err(ItemError::UnknownItemType {
            found: other.to_owned(),
        }),
    }
}

pub fn item_to_entity(item: &Item) -> Result<Entity, ItemError> {
    Ok(match item_kind(item)? {
        EntityKind::User => Entity::User(User {
            id: codec::id_from_bytes(get_b(item, "id")?)?,
            display_name: get_s(item, "display_name")?,
            email: get_s(item, "email")?,
            created_at: codec::decode_timestamp(get_n(item, "created_at")?)?,
        }),
        EntityKind::Resource => Entity::Resource(Resource {
            id: codec::id_from_bytes(get_b(item, "id")?)?,
            name: get_s(item, "name")?,
            created_at: codec::decode_timestamp(get_n(item, "created_at")?)?,
        }),
        EntityKind::Lease => Entity::Lease(Lease {
            id: codec::id_from_bytes(get_b(item, "id")?)?,
            user_id: codec::id_from_bytes(get_b(item, "user_id")?)?,
            resource_id: codec::id_from_bytes(get_b(item, "resource_id")?)?,
            reason: get_s(item, "reason")?,
            duration: codec::decode_duration(get_n(item, "duration_seconds")?)?,
            last_touched: codec::decode_timestamp(get_n(item, "last_touched")?)?,
            created_at: codec::decode_timestamp(get_n(item, "created_at")?)?,
            approver: match item.get("approver") {
                None => uuid::Uuid::nil(),
                Some(_) => codec::id_from_bytes(get_b(item, "approver")?)?,
            },
        }),
    })
}
