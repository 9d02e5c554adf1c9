//! Target collection descriptors.
//!
//! The set of collections migrated per user is configuration, not logic:
//! the pipeline walks whatever ordered [`CollectionSet`] it is given and
//! picks each collection's index body shape from its descriptor.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::PlexError;

/// Collections migrated when no explicit set is configured, in run order.
pub const DEFAULT_COLLECTIONS: [&str; 8] = [
    "activity",
    "document",
    "contact",
    "collection",
    "contentitem",
    "message",
    "resource",
    "task",
];

/// Collection whose records keep a body/topic pair in the index.
pub const CONTENT_ITEM: &str = "contentitem";

/// Which scalar fields a collection contributes to its index body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BodyShapeKind {
    /// `body` and `topic` copied from the document data
    ContentItem,
    /// `topic` derived from the document title
    #[default]
    Titled,
}

/// One migrated collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub name: String,
    #[serde(default)]
    pub shape: BodyShapeKind,
}

impl CollectionDescriptor {
    pub fn new(name: impl Into<String>, shape: BodyShapeKind) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// Descriptor with the shape the default set uses for `name`.
    pub fn for_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let shape = if name == CONTENT_ITEM {
            BodyShapeKind::ContentItem
        } else {
            BodyShapeKind::Titled
        };
        Self { name, shape }
    }
}

/// Ordered set of collections migrated for every user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionSet(Vec<CollectionDescriptor>);

impl Default for CollectionSet {
    fn default() -> Self {
        Self(
            DEFAULT_COLLECTIONS
                .iter()
                .map(|name| CollectionDescriptor::for_name(*name))
                .collect(),
        )
    }
}

impl CollectionSet {
    /// Build a set, rejecting empty and duplicate names.
    pub fn new(descriptors: Vec<CollectionDescriptor>) -> Result<Self, PlexError> {
        let set = Self(descriptors);
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<(), PlexError> {
        if self.0.is_empty() {
            return Err(PlexError::InvalidInput(
                "collection set must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for descriptor in &self.0 {
            if descriptor.name.trim().is_empty() {
                return Err(PlexError::InvalidInput(
                    "collection name must not be empty".to_string(),
                ));
            }
            if !seen.insert(descriptor.name.as_str()) {
                return Err(PlexError::InvalidInput(format!(
                    "duplicate collection '{}'",
                    descriptor.name
                )));
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectionDescriptor> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|d| d.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&CollectionDescriptor> {
        self.0.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_order_and_shapes() {
        let set = CollectionSet::default();
        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, DEFAULT_COLLECTIONS.to_vec());
        assert_eq!(
            set.get("contentitem").map(|d| d.shape),
            Some(BodyShapeKind::ContentItem)
        );
        assert_eq!(set.get("task").map(|d| d.shape), Some(BodyShapeKind::Titled));
        assert!(set.get("tuple").is_none());
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let dup = CollectionSet::new(vec![
            CollectionDescriptor::for_name("task"),
            CollectionDescriptor::for_name("task"),
        ]);
        assert!(dup.is_err());

        assert!(CollectionSet::new(Vec::new()).is_err());
        assert!(CollectionSet::new(vec![CollectionDescriptor::for_name(" ")]).is_err());
    }

    #[test]
    fn test_deserialize_shape_default() {
        let set: CollectionSet =
            serde_json::from_str(r#"[{"name":"note"},{"name":"page","shape":"content_item"}]"#)
                .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("note").unwrap().shape, BodyShapeKind::Titled);
        assert_eq!(set.get("page").unwrap().shape, BodyShapeKind::ContentItem);
    }
}
