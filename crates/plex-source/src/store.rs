//! Store traits consumed by the migration pipeline.

use std::sync::Arc;

use async_trait::async_trait;

use plex_types::{CollectionSet, ContainmentLink, SourceDocument, User};

use crate::error::SourceError;

/// Read-only access to the user directory.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Enumerate every user.
    async fn list_users(&self) -> Result<Vec<User>, SourceError>;
}

/// Opens the per-user source namespaces.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Attach accessors for `collections` in the namespace of `user`.
    async fn open_namespace(
        &self,
        user: &User,
        collections: &CollectionSet,
    ) -> Result<Arc<dyn UserNamespace>, SourceError>;
}

/// Accessors for one user's namespace. Shared read-only across fan-out
/// branches, so implementations must be safe for concurrent use.
#[async_trait]
pub trait UserNamespace: Send + Sync {
    /// Namespace name (`<userId>_Primary`).
    fn name(&self) -> &str;

    /// All documents of one attached collection.
    async fn find_documents(&self, collection: &str) -> Result<Vec<SourceDocument>, SourceError>;

    /// Links whose container is `source_id`, in store order.
    async fn find_links_from(&self, source_id: &str) -> Result<Vec<ContainmentLink>, SourceError>;
}
