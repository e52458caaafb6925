//! In-process hierarchical key-value store.
//!
//! Each item is written once under all of its key paths; the first path is
//! the primary one. Paths are kept in an ordered map so prefix scans return
//! entries sorted by path.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use parking_lot::RwLock;

/// One payload addressed by several key paths, primary first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathItem {
    pub key_paths: Vec<String>,
    pub payload: Vec<u8>,
}

/// Storage product primitive used by the hierarchical backend.
#[async_trait]
pub trait PathKv: Send + Sync {
    /// Atomically place the payload at every key path, replacing any previous
    /// version of the item (including aliases it no longer has).
    async fn put(&self, item: PathItem) -> anyhow::Result<()>;

    async fn get(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Remove the item reachable at `path` under all of its key paths.
    /// Returns true if something was removed.
    async fn delete(&self, path: &str) -> anyhow::Result<bool>;

    /// Entries whose path starts with `prefix`, sorted by path.
    async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, Vec<u8>)>>;
}

#[derive(Debug)]
struct StoredItem {
    key_paths: Vec<String>,
    payload: Arc<Vec<u8>>,
}

#[derive(Debug, Default)]
struct State {
    /// key path -> primary path of the owning item
    paths: BTreeMap<String, String>,
    /// primary path -> item
    items: HashMap<String, StoredItem>,
}

impl State {
    fn remove_item(&mut self, primary: &str) -> bool {
        match self.items.remove(primary) {
            Some(item) => {
                for path in &item.key_paths {
                    if self.paths.get(path).map(String::as_str) == Some(primary) {
                        self.paths.remove(path);
                    }
                }
                true
            }
            None => false,
        }
    }

    fn detach_alias(&mut self, path: &str, new_owner: &str) {
        let Some(owner) = self.paths.get(path).cloned() else {
            return;
        };
        if owner == new_owner {
            return;
        }
        if let Some(other) = self.items.get_mut(&owner) {
            other.key_paths.retain(|p| p != path);
        }
    }
}

/// Ordered in-memory realization of [`PathKv`].
#[derive(Debug, Default)]
pub struct MemoryPathKv {
    state: RwLock<State>,
    offline: AtomicBool,
}

impl MemoryPathKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a transport outage: every call fails while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored items (not paths).
    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_online(&self) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("path store is offline");
        }
        Ok(())
    }
}

#[async_trait]
impl PathKv for MemoryPathKv {
    async fn put(&self, item: PathItem) -> anyhow::Result<()> {
        self.ensure_online()?;
        let primary = item
            .key_paths
            .first()
            .cloned()
            .context("item has no key paths")?;

        let mut state = self.state.write();
        state.remove_item(&primary);
        for path in &item.key_paths {
            state.detach_alias(path, &primary);
            state.paths.insert(path.clone(), primary.clone());
        }
        state.items.insert(
            primary,
            StoredItem {
                key_paths: item.key_paths,
                payload: Arc::new(item.payload),
            },
        );
        Ok(())
    }

    async fn get(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.ensure_online()?;
        let state = self.state.read();
        Ok(state
            .paths
            .get(path)
            .and_then(|primary| state.items.get(primary))
            .map(|item| item.payload.as_ref().clone()))
    }

    async fn delete(&self, path: &str) -> anyhow::Result<bool> {
        self.ensure_online()?;
        let mut state = self.state.write();
        let Some(primary) = state.paths.get(path).cloned() else {
            return Ok(false);
        };
        Ok(state.remove_item(&primary))
    }

    async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, Vec<u8>)>> {
        self.ensure_online()?;
        let state = self.state.read();
        let entries = state
            .paths
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(path, _)| path.starts_with(prefix))
            .filter_map(|(path, primary)| {
                state
                    .items
                    .get(primary)
                    .map(|item| (path.clone(), item.payload.as_ref().clone()))
            })
            .collect();
        Ok(entries)
    }
}
