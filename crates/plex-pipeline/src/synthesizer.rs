//! Index body construction.

use plex_types::{
    BodyShape, BodyShapeKind, CollectionDescriptor, ContainmentGroups, IndexBody, IndexRecord,
    SourceDocument,
};

/// Build the index body for `doc`.
///
/// Content items keep their `body` and `topic` fields; every other shape keeps
/// only a topic taken from `title`. Child arrays are attached afterwards by
/// [`IndexBody::to_json`]. Pure.
pub fn synthesize(doc: &SourceDocument, kind: BodyShapeKind, children: ContainmentGroups) -> IndexBody {
    let shape = match kind {
        BodyShapeKind::ContentItem => BodyShape::ContentItem {
            body: doc.field("body").cloned(),
            topic: doc.field("topic").cloned(),
        },
        BodyShapeKind::Titled => BodyShape::Titled {
            topic: doc.field("title").cloned(),
        },
    };
    IndexBody::new(shape, children)
}

/// Address `doc` inside `index` under its collection's mapping type.
pub fn build_record(
    index: &str,
    descriptor: &CollectionDescriptor,
    doc: &SourceDocument,
    children: ContainmentGroups,
) -> IndexRecord {
    IndexRecord::new(
        index,
        descriptor.name.as_str(),
        doc.id.as_str(),
        synthesize(doc, descriptor.shape, children),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use plex_types::ContainmentLink;
    use serde_json::json;

    fn doc() -> SourceDocument {
        SourceDocument::new("d1", "document")
            .with_field("title", "Roadmap")
            .with_field("body", "full text")
            .with_field("topic", "planning")
    }

    #[test]
    fn test_titled_takes_topic_from_title() {
        let body = synthesize(&doc(), BodyShapeKind::Titled, ContainmentGroups::new());
        assert_eq!(body.to_json(), json!({ "topic": "Roadmap" }));
    }

    #[test]
    fn test_content_item_keeps_body_and_topic() {
        let body = synthesize(&doc(), BodyShapeKind::ContentItem, ContainmentGroups::new());
        assert_eq!(
            body.to_json(),
            json!({ "body": "full text", "topic": "planning" })
        );
    }

    #[test]
    fn test_missing_fields_are_omitted() {
        let bare = SourceDocument::new("d2", "task");
        let body = synthesize(&bare, BodyShapeKind::Titled, ContainmentGroups::new());
        assert_eq!(body.to_json(), json!({}));
    }

    #[test]
    fn test_build_record_addresses_user_index() {
        let links = [
            ContainmentLink::new("d1", "r1", "resource"),
            ContainmentLink::new("d1", "r2", "resource"),
        ];
        let record = build_record(
            "u2",
            &CollectionDescriptor::for_name("document"),
            &doc(),
            ContainmentGroups::from_links(&links),
        );

        assert_eq!(record.index, "u2");
        assert_eq!(record.doc_type, "document");
        assert_eq!(record.id, "d1");
        assert_eq!(
            record.body.to_json(),
            json!({ "topic": "Roadmap", "resource": ["r1", "r2"] })
        );
    }
}
