//! In-process single-table store with asynchronously maintained indexes.
//!
//! Base-table reads are strongly consistent. Secondary-index queries only see
//! a write once `index_propagation_delay` has elapsed on the table's clock;
//! until then they see the previously indexed version of the item, if any.
//! Items whose TTL attribute lies in the past are removed by
//! [`MemoryTable::sweep_expired`], never on read.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::clock::Clock;
use crate::domain::codec;
use crate::domain::keys::IndexName;
use crate::infra::storage::item::{
    string_attr, AttributeValue, Item, PARTITION_KEY, SORT_KEY, TTL_ATTRIBUTE,
};

/// Storage product primitive used by the single-table backend.
#[async_trait]
pub trait ItemTable: Send + Sync {
    /// Unconditional single-item write, replacing the item with the same key.
    async fn put_item(&self, item: Item) -> anyhow::Result<()>;

    async fn get_item(&self, partition: &str, sort: &str) -> anyhow::Result<Option<Item>>;

    /// Returns true if an item was removed.
    async fn delete_item(&self, partition: &str, sort: &str) -> anyhow::Result<bool>;

    /// Exact-match query on an index partition key, ordered by the index sort key.
    async fn query(&self, index: IndexName, partition: &str) -> anyhow::Result<Vec<Item>>;
}

#[derive(Debug, Clone)]
pub struct MemoryTableOptions {
    pub table_name: String,
    pub index_propagation_delay: Duration,
}

impl Default for MemoryTableOptions {
    fn default() -> Self {
        Self {
            table_name: "leases".to_owned(),
            index_propagation_delay: Duration::zero(),
        }
    }
}

#[derive(Debug)]
struct StoredItem {
    item: Item,
    /// When the current version becomes visible to index queries.
    indexed_at: DateTime<Utc>,
    /// What index queries see until then.
    previous: Option<Item>,
}

impl StoredItem {
    fn index_view(&self, now: DateTime<Utc>) -> Option<&Item> {
        if self.indexed_at <= now {
            Some(&self.item)
        } else {
            self.previous.as_ref()
        }
    }
}

type TableKey = (String, String);

pub struct MemoryTable {
    options: MemoryTableOptions,
    clock: Arc<dyn Clock>,
    items: RwLock<BTreeMap<TableKey, StoredItem>>,
    offline: AtomicBool,
}

impl MemoryTable {
    pub fn new(options: MemoryTableOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            options,
            clock,
            items: RwLock::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.options.table_name
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Garbage-collect items whose `expires_at` attribute is strictly before the
    /// current second. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = codec::epoch_seconds(self.clock.now());
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|_, stored| match stored.item.get(TTL_ATTRIBUTE) {
            Some(AttributeValue::N(expires)) => *expires >= now,
            _ => true,
        });
        let removed = before - items.len();
        if removed > 0 {
            debug!(table = %self.options.table_name, removed, "Swept expired items");
        }
        removed
    }

    fn ensure_online(&self) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("table '{}' is unreachable", self.options.table_name);
        }
        Ok(())
    }
}

fn key_of(item: &Item) -> anyhow::Result<TableKey> {
    let partition = string_attr(item, PARTITION_KEY).context("item has no string PK")?;
    let sort = string_attr(item, SORT_KEY).context("item has no string SK")?;
    Ok((partition, sort))
}

#[async_trait]
impl ItemTable for MemoryTable {
    async fn put_item(&self, item: Item) -> anyhow::Result<()> {
        self.ensure_online()?;
        let key = key_of(&item)?;
        let now = self.clock.now();
        let indexed_at = now + self.options.index_propagation_delay;

        let mut items = self.items.write();
        let previous = items
            .remove(&key)
            .and_then(|old| old.index_view(now).cloned());
        items.insert(
            key,
            StoredItem {
                item,
                indexed_at,
                previous,
            },
        );
        Ok(())
    }

    async fn get_item(&self, partition: &str, sort: &str) -> anyhow::Result<Option<Item>> {
        self.ensure_online()?;
        let key = (partition.to_owned(), sort.to_owned());
        Ok(self.items.read().get(&key).map(|stored| stored.item.clone()))
    }

    async fn delete_item(&self, partition: &str, sort: &str) -> anyhow::Result<bool> {
        self.ensure_online()?;
        let key = (partition.to_owned(), sort.to_owned());
        Ok(self.items.write().remove(&key).is_some())
    }

    async fn query(&self, index: IndexName, partition: &str) -> anyhow::Result<Vec<Item>> {
        self.ensure_online()?;
        let now = self.clock.now();
        let partition_attr = index.partition_attribute();
        let mut found: Vec<Item> = self
            .items
            .read()
            .values()
            .filter_map(|stored| stored.index_view(now))
            .filter(|item| string_attr(item, partition_attr).as_deref() == Some(partition))
            .cloned()
            .collect();

        if let Some(sort_attr) = index.sort_attribute() {
            found.sort_by(|a, b| {
                (string_attr(a, sort_attr), string_attr(a, PARTITION_KEY))
                    .cmp(&(string_attr(b, sort_attr), string_attr(b, PARTITION_KEY)))
            });
        }
        Ok(found)
    }
}
