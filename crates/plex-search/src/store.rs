//! Index store trait and response types.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use plex_types::IndexRecord;

use crate::error::SearchError;

/// Acknowledgement of a successful point write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexAck {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub version: Option<u64>,
}

/// Cluster health colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Green => write!(f, "green"),
            HealthStatus::Yellow => write!(f, "yellow"),
            HealthStatus::Red => write!(f, "red"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterHealth {
    pub cluster_name: String,
    pub status: HealthStatus,
    #[serde(default)]
    pub number_of_nodes: u32,
}

impl ClusterHealth {
    /// Yellow (unassigned replicas) still accepts writes; red does not.
    pub fn is_ready(&self) -> bool {
        self.status != HealthStatus::Red
    }
}

/// Store-wide statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Names of the indices present
    pub indices: Vec<String>,
    /// Index operations on primaries
    pub indexed_total: u64,
    /// Primary store size
    pub size_in_bytes: u64,
}

impl IndexStats {
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Write and admin access to the search-index store.
///
/// Shared read-only across fan-out branches; implementations must be safe
/// for concurrent use.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Write one record at `(index, type, id)`, replacing any previous body.
    async fn index(&self, record: &IndexRecord) -> Result<IndexAck, SearchError>;

    /// Delete every index.
    async fn delete_all_indices(&self) -> Result<(), SearchError>;

    async fn cluster_health(&self) -> Result<ClusterHealth, SearchError>;

    /// Mapping type names per index, both in name order.
    async fn mappings(&self) -> Result<BTreeMap<String, Vec<String>>, SearchError>;

    async fn stats(&self) -> Result<IndexStats, SearchError>;
}
