//! Pipeline configuration.

use std::time::Duration;

use plex_types::{CollectionSet, Settings};

/// Configuration for a migration run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Collections migrated per user, in order
    pub collections: CollectionSet,
    /// Documents of one collection in flight at once
    pub document_concurrency: usize,
    /// Users migrated at once
    pub user_concurrency: usize,
    /// Upper bound for any single store operation
    pub op_timeout: Duration,
    /// Delete every index before migrating
    pub wipe_indices: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collections: CollectionSet::default(),
            document_concurrency: 8,
            user_concurrency: 1,
            op_timeout: Duration::from_secs(60),
            wipe_indices: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            collections: settings.collections.clone(),
            document_concurrency: settings.document_concurrency.max(1),
            user_concurrency: settings.user_concurrency.max(1),
            op_timeout: Duration::from_secs(settings.op_timeout_secs),
            wipe_indices: settings.wipe_indices,
        }
    }

    pub fn with_collections(mut self, collections: CollectionSet) -> Self {
        self.collections = collections;
        self
    }

    /// Set the per-collection document concurrency (at least 1).
    pub fn with_document_concurrency(mut self, n: usize) -> Self {
        self.document_concurrency = n.max(1);
        self
    }

    /// Set the user concurrency (at least 1).
    pub fn with_user_concurrency(mut self, n: usize) -> Self {
        self.user_concurrency = n.max(1);
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    pub fn with_wipe_indices(mut self, wipe: bool) -> Self {
        self.wipe_indices = wipe;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            document_concurrency: 3,
            op_timeout_secs: 5,
            wipe_indices: false,
            ..Default::default()
        };
        let config = PipelineConfig::from_settings(&settings);
        assert_eq!(config.document_concurrency, 3);
        assert_eq!(config.op_timeout, Duration::from_secs(5));
        assert!(!config.wipe_indices);
        assert_eq!(config.collections.len(), 8);
    }

    #[test]
    fn test_concurrency_floor() {
        let config = PipelineConfig::default()
            .with_document_concurrency(0)
            .with_user_concurrency(0);
        assert_eq!(config.document_concurrency, 1);
        assert_eq!(config.user_concurrency, 1);
    }
}
