//! Search-index store access.
//!
//! The migration writes one index per user and one mapping type per
//! collection. [`IndexStore`] covers the point write plus the admin calls
//! the run needs around it: readiness check, pre-run wipe, mapping and
//! statistics for the post-run consistency check.
//!
//! - [`ElasticClient`]: HTTP client for an Elasticsearch cluster with
//!   bounded retry and exponential backoff
//! - [`MemoryIndexStore`]: in-process store for tests

mod elastic;
mod error;
mod memory;
mod store;

pub use elastic::{ElasticClient, ElasticConfig};
pub use error::SearchError;
pub use memory::MemoryIndexStore;
pub use store::{ClusterHealth, HealthStatus, IndexAck, IndexStats, IndexStore};
