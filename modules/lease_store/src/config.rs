use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which storage backend realizes the key/index scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Hierarchical key paths; indexes are immediately consistent.
    #[default]
    Hierarchical,
    /// One flat table with secondary indexes; index reads are eventually consistent.
    SingleTable,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hierarchical => "hierarchical",
            Self::SingleTable => "single_table",
        }
    }
}

/// Configuration for the lease_store module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeaseStoreConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// How long single-table index queries lag behind writes.
    #[serde(default, with = "humantime_serde")]
    pub index_propagation_delay: Duration,
    #[serde(default)]
    pub enforce_references: bool,
}

impl Default for LeaseStoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            table_name: default_table_name(),
            index_propagation_delay: Duration::ZERO,
            enforce_references: false,
        }
    }
}

fn default_table_name() -> String {
    "leases".to_string()
}
