//! Source-side readers for the migration.
//!
//! Two stores feed the pipeline:
//! - the directory store, which lists every [`User`](plex_types::User)
//! - one namespace per user (`<id>_Primary`) holding the target collections
//!   and the containment links between their documents
//!
//! ## Key Components
//!
//! - [`DirectoryStore`], [`SourceStore`], [`UserNamespace`]: async traits the
//!   pipeline depends on
//! - [`DumpSource`]: reads a mongoexport-style dump (one JSON object per line)
//! - [`MemorySource`]: in-process store for tests and fixtures, with failure
//!   injection

pub mod dump;
pub mod error;
pub mod memory;
pub mod store;

pub use dump::DumpSource;
pub use error::SourceError;
pub use memory::MemorySource;
pub use store::{DirectoryStore, SourceStore, UserNamespace};
