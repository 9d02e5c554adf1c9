//! Migration pipeline for moving plex namespaces into search indices.
//!
//! This crate drives the one-shot batch migration: every directory user gets
//! one search index holding one denormalized record per document of the
//! target collections, each enriched with the ids of the documents it
//! directly contains.
//!
//! ## Key Components
//!
//! - [`Migration`]: enumerates users, drives their pipelines, verifies the result
//! - [`UserPipeline`]: fans out one [`CollectionProcessor`] per target collection
//! - [`CollectionProcessor`]: fans out one [`DocumentIngestor`] call per document
//! - [`CompletionMatrix`]: per-user bookkeeping that detects finished and empty users
//! - [`resolve_containment`] and [`synthesize`]: link lookup and body construction
//! - [`verify`]: post-run cross-check against the index store's statistics
//!
//! ## Architecture
//!
//! ```text
//! Migration -> UserPipeline -> CollectionProcessor -> DocumentIngestor
//!                                                      |- resolve_containment
//!                                                      |- synthesize
//!                                                      '- IndexStore::index
//! ```
//!
//! Completion flows back up through the [`CompletionMatrix`]. All fan-out is
//! structured: children are joined, the first fatal error cancels the shared
//! [`RunContext`] token, siblings drain, and that first error is returned.
//!
//! ## Example
//!
//! ```ignore
//! use plex_pipeline::{Migration, PipelineConfig};
//!
//! let migration = Migration::new(directory, source, index_store, PipelineConfig::default());
//! let report = migration.run().await?;
//! report.ensure_consistent()?;
//! ```

pub mod collection;
pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod ingestor;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod resolver;
pub mod synthesizer;
pub mod user;
pub mod verifier;

pub use collection::{CollectionProcessor, CollectionSummary};
pub use completion::{CollectionState, CompletionMatrix, Transition, UserClass};
pub use config::PipelineConfig;
pub use context::RunContext;
pub use error::{ConsistencyFailure, PipelineError};
pub use ingestor::{DocumentIngestor, DocumentOutcome, SUPERSEDED_PARENT_TYPE};
pub use orchestrator::Migration;
pub use progress::{LoggingProgressCallback, NoOpProgressCallback, ProgressCallback};
pub use report::{DocumentTally, FailedDocument, MigrationReport, UserSummary, VerificationReport};
pub use resolver::resolve_containment;
pub use synthesizer::{build_record, synthesize};
pub use user::UserPipeline;
pub use verifier::verify;
