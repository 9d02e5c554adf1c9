//! Index records written to the search store.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::document::ContainmentGroups;

/// Type-specific scalar part of an index body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BodyShape {
    /// Content items keep their body text and topic.
    ContentItem {
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        topic: Option<Value>,
    },
    /// Everything else keeps only a topic taken from the title.
    Titled {
        #[serde(skip_serializing_if = "Option::is_none")]
        topic: Option<Value>,
    },
}

/// Denormalized body: the type-specific fields plus one array of child ids
/// per child collection type.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBody {
    pub shape: BodyShape,
    pub children: ContainmentGroups,
}

impl IndexBody {
    pub fn new(shape: BodyShape, children: ContainmentGroups) -> Self {
        Self { shape, children }
    }

    /// Render the body as a JSON object.
    ///
    /// Child arrays are merged after the scalar fields, so a child collection
    /// named like a scalar field replaces it.
    pub fn to_json(&self) -> Value {
        let mut object = match serde_json::to_value(&self.shape) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (collection, ids) in self.children.iter() {
            object.insert(
                collection.clone(),
                Value::Array(ids.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(object)
    }
}

/// One document destined for the search store.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    /// Destination index (the user id)
    pub index: String,
    /// Mapping type (the collection name)
    pub doc_type: String,
    /// Document id
    pub id: String,
    pub body: IndexBody,
}

impl IndexRecord {
    pub fn new(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        id: impl Into<String>,
        body: IndexBody,
    ) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            body,
        }
    }
}
