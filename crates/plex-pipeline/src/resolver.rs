//! Containment lookup for a single document.

use tracing::debug;

use plex_source::{SourceError, UserNamespace};
use plex_types::ContainmentGroups;

use crate::context::RunContext;
use crate::error::PipelineError;

/// Group the direct children of `doc_id` by child collection.
///
/// Child ids keep the order the store returned them in, duplicates included.
/// A document with no outgoing links yields an empty mapping. Lookup failures
/// and malformed links are fatal: an index record written without its
/// children would silently under-enrich the result.
pub async fn resolve_containment(
    ctx: &RunContext,
    namespace: &dyn UserNamespace,
    doc_id: &str,
) -> Result<ContainmentGroups, PipelineError> {
    let links = ctx
        .bounded("containment lookup", namespace.find_links_from(doc_id))
        .await?
        .map_err(|source| PipelineError::Containment {
            doc_id: doc_id.to_string(),
            source,
        })?;

    if let Some(bad) = links
        .iter()
        .find(|link| link.dest_id.is_empty() || link.dest_collection.is_empty())
    {
        return Err(PipelineError::Containment {
            doc_id: doc_id.to_string(),
            source: SourceError::Malformed {
                location: namespace.name().to_string(),
                reason: format!(
                    "link from {} has dest '{}' in collection '{}'",
                    bad.source_id, bad.dest_id, bad.dest_collection
                ),
            },
        });
    }

    let groups = ContainmentGroups::from_links(&links);
    debug!(
        doc_id,
        children = groups.child_count(),
        child_types = groups.len(),
        "Resolved containment"
    );
    Ok(groups)
}
