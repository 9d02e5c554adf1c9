//! In-process index store for tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use plex_types::IndexRecord;

use crate::error::SearchError;
use crate::store::{ClusterHealth, HealthStatus, IndexAck, IndexStats, IndexStore};

type Documents = BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>;

#[derive(Default)]
struct State {
    // index -> type -> id -> body
    documents: Documents,
    index_ops: u64,
    versions: BTreeMap<(String, String, String), u64>,
}

/// Index store that keeps documents in memory.
///
/// Indices and mapping types appear on first write, the way a cluster with
/// dynamic mapping behaves.
pub struct MemoryIndexStore {
    state: Mutex<State>,
    failing_ids: HashSet<String>,
    status: HealthStatus,
    unreachable: bool,
}

impl Default for MemoryIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            failing_ids: HashSet::new(),
            status: HealthStatus::Green,
            unreachable: false,
        }
    }

    /// Reject every write of a document with this id.
    pub fn fail_writes_for(mut self, id: impl Into<String>) -> Self {
        self.failing_ids.insert(id.into());
        self
    }

    pub fn with_status(mut self, status: HealthStatus) -> Self {
        self.status = status;
        self
    }

    /// Fail every call as if the cluster were down.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Pre-populate an index, e.g. to check that a wipe removes it.
    pub fn seed(&self, index: &str, doc_type: &str, id: &str, body: Value) {
        let mut state = self.lock();
        state
            .documents
            .entry(index.to_string())
            .or_default()
            .entry(doc_type.to_string())
            .or_default()
            .insert(id.to_string(), body);
    }

    pub fn get(&self, index: &str, doc_type: &str, id: &str) -> Option<Value> {
        self.lock()
            .documents
            .get(index)
            .and_then(|types| types.get(doc_type))
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Documents stored in one index, across all types.
    pub fn document_count(&self, index: &str) -> usize {
        self.lock()
            .documents
            .get(index)
            .map(|types| types.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    pub fn index_names(&self) -> Vec<String> {
        self.lock().documents.keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_reachable(&self) -> Result<(), SearchError> {
        if self.unreachable {
            return Err(SearchError::Request("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn index(&self, record: &IndexRecord) -> Result<IndexAck, SearchError> {
        self.check_reachable()?;
        if self.failing_ids.contains(&record.id) {
            return Err(SearchError::Status {
                status: 500,
                body: format!("write of {} rejected", record.id),
            });
        }

        let mut state = self.lock();
        state
            .documents
            .entry(record.index.clone())
            .or_default()
            .entry(record.doc_type.clone())
            .or_default()
            .insert(record.id.clone(), record.body.to_json());
        state.index_ops += 1;
        let version = state
            .versions
            .entry((record.index.clone(), record.doc_type.clone(), record.id.clone()))
            .or_insert(0);
        *version += 1;
        let version = *version;

        Ok(IndexAck {
            index: record.index.clone(),
            doc_type: record.doc_type.clone(),
            id: record.id.clone(),
            version: Some(version),
        })
    }

    async fn delete_all_indices(&self) -> Result<(), SearchError> {
        self.check_reachable()?;
        let mut state = self.lock();
        state.documents.clear();
        state.versions.clear();
        Ok(())
    }

    async fn cluster_health(&self) -> Result<ClusterHealth, SearchError> {
        self.check_reachable()?;
        Ok(ClusterHealth {
            cluster_name: "memory".to_string(),
            status: self.status,
            number_of_nodes: 1,
        })
    }

    async fn mappings(&self) -> Result<BTreeMap<String, Vec<String>>, SearchError> {
        self.check_reachable()?;
        Ok(self
            .lock()
            .documents
            .iter()
            .map(|(index, types)| (index.clone(), types.keys().cloned().collect()))
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats, SearchError> {
        self.check_reachable()?;
        let state = self.lock();
        let size_in_bytes = state
            .documents
            .values()
            .flat_map(|types| types.values())
            .flat_map(|docs| docs.values())
            .map(|body| body.to_string().len() as u64)
            .sum();
        Ok(IndexStats {
            indices: state.documents.keys().cloned().collect(),
            indexed_total: state.index_ops,
            size_in_bytes,
        })
    }
}
