//! # plex-types
//!
//! Shared domain types for the plex-to-search migration.
//!
//! This crate defines the data structures passed between the source readers,
//! the search-index client and the migration pipeline:
//! - Users: directory entries, each owning one source namespace and one index
//! - Source documents and containment links read from a user's namespace
//! - Collection descriptors: the ordered set of collections migrated per user
//! - Index records: denormalized bodies written to the search index
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use plex_types::{CollectionSet, User};
//!
//! let user = User::new("5a1f", "ada");
//! assert_eq!(user.namespace(), "5a1f_Primary");
//! assert_eq!(CollectionSet::default().len(), 8);
//! ```

pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod record;
pub mod user;

pub use collection::{BodyShapeKind, CollectionDescriptor, CollectionSet, CONTENT_ITEM, DEFAULT_COLLECTIONS};
pub use config::{EndpointSettings, IndexSettings, Settings};
pub use document::{ContainmentGroups, ContainmentLink, SourceDocument};
pub use error::PlexError;
pub use record::{BodyShape, IndexBody, IndexRecord};
pub use user::User;
