//! Export-dump source store.
//!
//! Reads a mongoexport-style dump laid out as one directory per database:
//!
//! ```text
//! <root>/<directory_db>/users.json
//! <root>/<userId>_Primary/<collection>.json
//! <root>/<userId>_Primary/tuples.json
//! ```
//!
//! Files hold one JSON object per line (or a single JSON array). Ids may be
//! plain strings or extended-JSON `{"$oid": "..."}` objects.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use plex_types::{CollectionSet, ContainmentLink, SourceDocument, User};

use crate::error::SourceError;
use crate::store::{DirectoryStore, SourceStore, UserNamespace};

/// File holding the directory's users.
pub const USERS_FILE: &str = "users.json";

/// File holding a namespace's containment links.
pub const TUPLES_FILE: &str = "tuples.json";

/// Source store over an exported dump directory.
#[derive(Debug, Clone)]
pub struct DumpSource {
    root: PathBuf,
    directory_db: String,
}

impl DumpSource {
    pub fn new(root: impl Into<PathBuf>, directory_db: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            directory_db: directory_db.into(),
        }
    }
}

#[async_trait]
impl DirectoryStore for DumpSource {
    async fn list_users(&self) -> Result<Vec<User>, SourceError> {
        let path = self.root.join(&self.directory_db).join(USERS_FILE);
        let records = read_records(&path).await?.ok_or_else(|| {
            SourceError::Unavailable(format!("directory dump not found at {}", path.display()))
        })?;

        records
            .into_iter()
            .map(|(location, record)| {
                let id = record
                    .get("_id")
                    .and_then(object_id)
                    .ok_or_else(|| SourceError::malformed(&location, "missing _id"))?;
                let username = record
                    .get("username")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Ok(User::new(id, username))
            })
            .collect()
    }
}

#[async_trait]
impl SourceStore for DumpSource {
    async fn open_namespace(
        &self,
        user: &User,
        collections: &CollectionSet,
    ) -> Result<Arc<dyn UserNamespace>, SourceError> {
        let name = user.namespace();
        let dir = self.root.join(&name);

        let mut links: HashMap<String, Vec<ContainmentLink>> = HashMap::new();
        let tuples = read_records(&dir.join(TUPLES_FILE)).await?.unwrap_or_default();
        for (location, record) in tuples {
            let link = parse_link(&location, &record)?;
            links.entry(link.source_id.clone()).or_default().push(link);
        }

        debug!(namespace = %name, containers = links.len(), "Opened namespace");

        Ok(Arc::new(DumpNamespace {
            name,
            dir,
            attached: collections.names().map(str::to_string).collect(),
            links,
        }))
    }
}

struct DumpNamespace {
    name: String,
    dir: PathBuf,
    attached: HashSet<String>,
    links: HashMap<String, Vec<ContainmentLink>>,
}

#[async_trait]
impl UserNamespace for DumpNamespace {
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

        // A collection that was never exported is an empty collection.
        let path = self.dir.join(format!("{collection}.json"));
        let Some(records) = read_records(&path).await? else {
            return Ok(Vec::new());
        };

        records
            .iter()
            .map(|(location, record)| parse_document(location, collection, record))
            .collect()
    }

    async fn find_links_from(&self, source_id: &str) -> Result<Vec<ContainmentLink>, SourceError> {
        Ok(self.links.get(source_id).cloned().unwrap_or_default())
    }
}

/// Read every record of a dump file, tagged with `file:line` for errors.
/// Returns `None` when the file does not exist.
async fn read_records(path: &Path) -> Result<Option<Vec<(String, Map<String, Value>)>>, SourceError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SourceError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();

    if content.trim_start().starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(&content)
            .map_err(|e| SourceError::malformed(&file, e.to_string()))?;
        return values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let location = format!("{file}[{i}]");
                into_object(&location, value).map(|obj| (location, obj))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some);
    }

    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let location = format!("{}:{}", file, i + 1);
        let value: Value = serde_json::from_str(line)
            .map_err(|e| SourceError::malformed(&location, e.to_string()))?;
        let object = into_object(&location, value)?;
        records.push((location, object));
    }
    Ok(Some(records))
}

fn into_object(location: &str, value: Value) -> Result<Map<String, Value>, SourceError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(SourceError::malformed(
            location,
            format!("expected an object, got {other}"),
        )),
    }
}

/// Accept `"abc"` or `{"$oid": "abc"}`.
fn object_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn parse_document(
    location: &str,
    collection: &str,
    record: &Map<String, Value>,
) -> Result<SourceDocument, SourceError> {
    let id = record
        .get("_id")
        .and_then(object_id)
        .ok_or_else(|| SourceError::malformed(location, "missing _id"))?;

    let system = record.get("s").and_then(Value::as_object);
    let parent_id = system.and_then(|s| s.get("pId")).and_then(object_id);
    let parent_type = system
        .and_then(|s| s.get("pType"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let data = match record.get("data") {
        Some(Value::Object(map)) => map.clone(),
        None | Some(Value::Null) => Map::new(),
        Some(_) => return Err(SourceError::malformed(location, "data is not an object")),
    };

    Ok(SourceDocument {
        id,
        collection: collection.to_string(),
        parent_id,
        parent_type,
        data,
    })
}

fn parse_link(location: &str, record: &Map<String, Value>) -> Result<ContainmentLink, SourceError> {
    let data = record
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| SourceError::malformed(location, "missing data"))?;
    let field = |key: &str| {
        data.get(key)
            .and_then(object_id)
            .ok_or_else(|| SourceError::malformed(location, format!("missing data.{key}")))
    };
    Ok(ContainmentLink::new(
        field("srcObj")?,
        field("destObj")?,
        field("destObjCN")?,
    ))
}
