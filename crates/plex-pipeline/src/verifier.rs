//! Post-run consistency check against the index store.

use tracing::{info, warn};

use crate::context::RunContext;
use crate::error::{ConsistencyFailure, PipelineError};
use crate::report::VerificationReport;

/// Cross-check the index store against what the run produced.
///
/// Expects one index per non-empty user, and as many mapping types on the
/// first index (in name order) as there are target collections. Mismatches
/// are collected in the report; only failures to read the store are errors.
pub async fn verify(
    ctx: &RunContext,
    users_processed: usize,
    empty_users: usize,
) -> Result<VerificationReport, PipelineError> {
    let store = &ctx.index_store;

    let stats = ctx
        .bounded("stats", store.stats())
        .await?
        .map_err(|source| PipelineError::IndexStore {
            operation: "stats",
            source,
        })?;
    let mappings = ctx
        .bounded("mappings", store.mappings())
        .await?
        .map_err(|source| PipelineError::IndexStore {
            operation: "mappings",
            source,
        })?;

    let expected_indices = users_processed.saturating_sub(empty_users);
    let expected_mappings = ctx.config.collections.len();

    let mut report = VerificationReport {
        expected_indices,
        indices_present: stats.index_count(),
        expected_mappings,
        mapping_index: None,
        mapping_count: None,
        indexed_total: stats.indexed_total,
        size_in_bytes: stats.size_in_bytes,
        failures: Vec::new(),
    };

    if report.indices_present != expected_indices {
        report.failures.push(ConsistencyFailure::IndexCount {
            expected: expected_indices,
            actual: report.indices_present,
        });
    }

    if let Some((index, types)) = mappings.iter().next() {
        report.mapping_index = Some(index.clone());
        report.mapping_count = Some(types.len());
        if types.len() != expected_mappings {
            report.failures.push(ConsistencyFailure::MappingCount {
                index: index.clone(),
                expected: expected_mappings,
                actual: types.len(),
            });
        }
    }

    if report.passed() {
        info!(
            indices = report.indices_present,
            indexed_total = report.indexed_total,
            size_in_bytes = report.size_in_bytes,
            "Verification passed"
        );
    } else {
        for failure in &report.failures {
            warn!(%failure, "Verification failed");
        }
    }
    Ok(report)
}
