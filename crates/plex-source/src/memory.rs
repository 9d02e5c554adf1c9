//! In-process source store.
//!
//! Holds users, documents and links in memory. Used by tests and fixtures;
//! individual reads can be made to fail to exercise the pipeline's error
//! paths.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use plex_types::{CollectionSet, ContainmentLink, SourceDocument, User};

use crate::error::SourceError;
use crate::store::{DirectoryStore, SourceStore, UserNamespace};

#[derive(Debug, Default, Clone)]
struct NamespaceData {
    documents: HashMap<String, Vec<SourceDocument>>,
    links: Vec<ContainmentLink>,
    failing_collections: HashSet<String>,
    failing_links: HashSet<String>,
}

/// Source store backed by in-memory maps.
#[derive(Debug, Default)]
pub struct MemorySource {
    users: Vec<User>,
    namespaces: HashMap<String, NamespaceData>,
    directory_down: bool,
    link_queries: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, user: User) -> &mut Self {
        self.namespaces.entry(user.namespace()).or_default();
        self.users.push(user);
        self
    }

    /// Add a document to `user_id`'s namespace under `doc.collection`.
    pub fn add_document(&mut self, user_id: &str, doc: SourceDocument) -> &mut Self {
        self.namespace_mut(user_id)
            .documents
            .entry(doc.collection.clone())
            .or_default()
            .push(doc);
        self
    }

    pub fn add_link(&mut self, user_id: &str, link: ContainmentLink) -> &mut Self {
        self.namespace_mut(user_id).links.push(link);
        self
    }

    /// Make `list_users` fail.
    pub fn fail_directory(&mut self) -> &mut Self {
        self.directory_down = true;
        self
    }

    /// Make document enumeration of one collection fail.
    pub fn fail_collection(&mut self, user_id: &str, collection: &str) -> &mut Self {
        self.namespace_mut(user_id)
            .failing_collections
            .insert(collection.to_string());
        self
    }

    /// Make the link query for one container fail.
    pub fn fail_links_for(&mut self, user_id: &str, source_id: &str) -> &mut Self {
        self.namespace_mut(user_id)
            .failing_links
            .insert(source_id.to_string());
        self
    }

    /// Number of link queries served so far, across all namespaces.
    pub fn link_queries(&self) -> usize {
        self.link_queries.load(Ordering::SeqCst)
    }

    fn namespace_mut(&mut self, user_id: &str) -> &mut NamespaceData {
        self.namespaces
            .entry(format!("{}{}", user_id, plex_types::user::NAMESPACE_SUFFIX))
            .or_default()
    }
}

#[async_trait]
impl DirectoryStore for MemorySource {
    async fn list_users(&self) -> Result<Vec<User>, SourceError> {
        if self.directory_down {
            return Err(SourceError::Unavailable("directory store is down".to_string()));
        }
        Ok(self.users.clone())
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn open_namespace(
        &self,
        user: &User,
        collections: &CollectionSet,
    ) -> Result<Arc<dyn UserNamespace>, SourceError> {
        let name = user.namespace();
        let data = self.namespaces.get(&name).cloned().unwrap_or_default();
        Ok(Arc::new(MemoryNamespace {
            name,
            attached: collections.names().map(str::to_string).collect(),
            data,
            link_queries: Arc::clone(&self.link_queries),
        }))
    }
}

struct MemoryNamespace {
    name: String,
    attached: HashSet<String>,
    data: NamespaceData,
    link_queries: Arc<AtomicUsize>,
}

#[async_trait]
impl UserNamespace for MemoryNamespace {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_documents(&self, collection: &str) -> Result<Vec<SourceDocument>, SourceError> {
        if !self.attached.contains(collection) {
            return Err(SourceError::UnknownCollection {
                namespace: self.name.clone(),
                collection: collection.to_string(),
            });
        }
        if self.data.failing_collections.contains(collection) {
            return Err(SourceError::Unavailable(format!(
                "{}.{} is unreadable",
                self.name, collection
            )));
        }
        Ok(self
            .data
            .documents
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_links_from(&self, source_id: &str) -> Result<Vec<ContainmentLink>, SourceError> {
        self.link_queries.fetch_add(1, Ordering::SeqCst);
        if self.data.failing_links.contains(source_id) {
            return Err(SourceError::Unavailable(format!(
                "link query for {source_id} failed"
            )));
        }
        Ok(self
            .data
            .links
            .iter()
            .filter(|link| link.source_id == source_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> MemorySource {
        let mut source = MemorySource::new();
        source
            .add_user(User::new("u1", "ada"))
            .add_document("u1", SourceDocument::new("d1", "document"))
            .add_document("u1", SourceDocument::new("d2", "document"))
            .add_link("u1", ContainmentLink::new("d1", "r1", "resource"))
            .add_link("u1", ContainmentLink::new("d2", "r2", "resource"));
        source
    }

    #[tokio::test]
    async fn test_namespace_reads() {
        let source = fixture();
        let users = source.list_users().await.unwrap();
        assert_eq!(users.len(), 1);

        let ns = source
            .open_namespace(&users[0], &CollectionSet::default())
            .await
            .unwrap();
        assert_eq!(ns.name(), "u1_Primary");
        assert_eq!(ns.find_documents("document").await.unwrap().len(), 2);
        assert!(ns.find_documents("task").await.unwrap().is_empty());

        let links = ns.find_links_from("d1").await.unwrap();
        assert_eq!(links, vec![ContainmentLink::new("d1", "r1", "resource")]);
        assert_eq!(source.link_queries(), 1);
    }

    #[tokio::test]
    async fn test_unattached_collection_rejected() {
        let source = fixture();
        let ns = source
            .open_namespace(&User::new("u1", "ada"), &CollectionSet::default())
            .await
            .unwrap();
        let err = ns.find_documents("tuple").await.unwrap_err();
        assert!(matches!(err, SourceError::UnknownCollection { .. }));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mut source = fixture();
        source.fail_links_for("u1", "d2").fail_collection("u1", "task");
        let ns = source
            .open_namespace(&User::new("u1", "ada"), &CollectionSet::default())
            .await
            .unwrap();
        assert!(ns.find_links_from("d1").await.is_ok());
        assert!(ns.find_links_from("d2").await.is_err());
        assert!(ns.find_documents("task").await.is_err());

        source.fail_directory();
        assert!(source.list_users().await.is_err());
    }
}
