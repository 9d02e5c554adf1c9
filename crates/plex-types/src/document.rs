//! Source documents and containment links.
//!
//! Both are read-only to the migration: they are owned by the source store
//! and only ever projected into index records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A document read from one collection of a user's namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Document id (hex object id in the source store)
    pub id: String,

    /// Collection the document was read from
    pub collection: String,

    /// Id of the declared parent, if any
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Collection type of the declared parent, if any
    #[serde(default)]
    pub parent_type: Option<String>,

    /// Type-specific fields (`title`, `body`, `topic`, ...)
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            parent_id: None,
            parent_type: None,
            data: Map::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>, parent_type: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self.parent_type = Some(parent_type.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Look up a type-specific field; JSON null counts as absent.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key).filter(|v| !v.is_null())
    }

    /// True when the declared parent is of the given collection type.
    pub fn has_parent_type(&self, parent_type: &str) -> bool {
        self.parent_type.as_deref() == Some(parent_type)
    }
}

/// Directed edge: `source_id` contains `dest_id`, a `dest_collection` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainmentLink {
    pub source_id: String,
    pub dest_id: String,
    pub dest_collection: String,
}

impl ContainmentLink {
    pub fn new(
        source_id: impl Into<String>,
        dest_id: impl Into<String>,
        dest_collection: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            dest_id: dest_id.into(),
            dest_collection: dest_collection.into(),
        }
    }
}

/// Children of one container, grouped by the child's collection type.
///
/// Ids keep link order within a group and duplicates are preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainmentGroups(BTreeMap<String, Vec<String>>);

impl ContainmentGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group links by destination collection, in iteration order.
    pub fn from_links<'a>(links: impl IntoIterator<Item = &'a ContainmentLink>) -> Self {
        let mut groups = Self::new();
        for link in links {
            groups.push(&link.dest_collection, &link.dest_id);
        }
        groups
    }

    pub fn push(&mut self, collection: &str, child_id: &str) {
        self.0
            .entry(collection.to_string())
            .or_default()
            .push(child_id.to_string());
    }

    pub fn get(&self, collection: &str) -> Option<&[String]> {
        self.0.get(collection).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Number of distinct child collection types.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total child ids across all groups.
    pub fn child_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}
