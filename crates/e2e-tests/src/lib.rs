//! End-to-end test infrastructure for plex-migrate.
//!
//! Provides a shared TestHarness and helper functions for E2E tests
//! covering the full directory-to-index migration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use plex_pipeline::{Migration, PipelineConfig};
use plex_search::MemoryIndexStore;
use plex_source::MemorySource;
use plex_types::{CollectionSet, ContainmentLink, SourceDocument, User, DEFAULT_COLLECTIONS};

/// Shared test harness for E2E tests.
///
/// Collects users, documents and links into an in-memory source, then hands
/// out a [`Migration`] bound to it and to an in-memory index store.
pub struct TestHarness {
    /// Source being populated; frozen by [`TestHarness::migration`]
    pub source: MemorySource,
    /// Index store shared with the migration
    pub store: Arc<MemoryIndexStore>,
    /// Pipeline configuration used by the migration
    pub config: PipelineConfig,
}

impl TestHarness {
    /// Create a harness with an empty source and a healthy index store.
    pub fn new() -> Self {
        Self::with_store(MemoryIndexStore::new())
    }

    /// Create a harness around a preconfigured index store.
    pub fn with_store(store: MemoryIndexStore) -> Self {
        Self {
            source: MemorySource::new(),
            store: Arc::new(store),
            config: test_config(),
        }
    }

    pub fn add_user(&mut self, id: &str, username: &str) -> &mut Self {
        self.source.add_user(User::new(id, username));
        self
    }

    pub fn add_document(&mut self, user_id: &str, doc: SourceDocument) -> &mut Self {
        self.source.add_document(user_id, doc);
        self
    }

    pub fn add_link(&mut self, user_id: &str, source_id: &str, dest_id: &str, dest_collection: &str) -> &mut Self {
        self.source
            .add_link(user_id, ContainmentLink::new(source_id, dest_id, dest_collection));
        self
    }

    /// Give `user_id` one titled document in every default collection, so
    /// its index ends up with a mapping type per collection.
    pub fn populate_every_collection(&mut self, user_id: &str) -> &mut Self {
        for collection in DEFAULT_COLLECTIONS {
            let doc = SourceDocument::new(format!("{user_id}-{collection}-1"), collection)
                .with_field("title", format!("{collection} of {user_id}"));
            self.source.add_document(user_id, doc);
        }
        self
    }

    /// Freeze the source and build a migration over it.
    ///
    /// The returned source handle exposes counters such as
    /// [`MemorySource::link_queries`].
    pub fn migration(self) -> (Migration, Arc<MemorySource>, Arc<MemoryIndexStore>) {
        let source = Arc::new(self.source);
        let migration = Migration::new(source.clone(), source.clone(), self.store.clone(), self.config);
        (migration, source, self.store)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipeline configuration for tests: default collections, small fan-out,
/// short timeouts.
pub fn test_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_collections(CollectionSet::default())
        .with_document_concurrency(4)
        .with_user_concurrency(2)
        .with_op_timeout(Duration::from_secs(5))
}

/// Child ids of one collection in an indexed body, in stored order.
pub fn child_ids(body: &Value, collection: &str) -> Option<Vec<String>> {
    body.get(collection)?.as_array().map(|ids| {
        ids.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

/// Write one export file (one JSON object per line) under `root/db/`.
pub fn write_dump_file(root: &Path, db: &str, file: &str, records: &[Value]) {
    let dir = root.join(db);
    std::fs::create_dir_all(&dir).expect("Failed to create dump dir");
    let content: String = records.iter().map(|r| format!("{r}\n")).collect();
    std::fs::write(dir.join(file), content).expect("Failed to write dump file");
}

/// Export-style document record.
pub fn dump_document(id: &str, title: &str) -> Value {
    json!({ "_id": { "$oid": id }, "data": { "title": title } })
}

/// Export-style containment link record.
pub fn dump_link(source_id: &str, dest_id: &str, dest_collection: &str) -> Value {
    json!({
        "data": {
            "srcObj": { "$oid": source_id },
            "destObj": { "$oid": dest_id },
            "destObjCN": dest_collection
        }
    })
}
