//! Command implementations.
//!
//! Handles:
//! - `run`: preflight, migrate every user, verify, print the report
//! - `health`: print index cluster health
//! - `users`: list directory users

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::{info, warn};

use plex_pipeline::{LoggingProgressCallback, Migration, MigrationReport, PipelineConfig};
use plex_search::{ElasticClient, ElasticConfig, IndexStore};
use plex_source::{DirectoryStore, DumpSource};
use plex_types::Settings;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<String>,
    pub log_level: Option<String>,
    pub env: Option<String>,
}

/// Load settings and apply the global CLI overrides (highest precedence).
fn load_settings(options: &GlobalOptions) -> Result<Settings> {
    let mut settings = Settings::load(options.config.as_deref()).context("Failed to load configuration")?;

    if let Some(env) = &options.env {
        settings.environment = env.clone();
        settings.validate().context("Invalid environment")?;
    }
    Ok(settings)
}

fn init_logging(settings: &Settings, options: &GlobalOptions) -> Result<()> {
    let level = options
        .log_level
        .as_deref()
        .unwrap_or_else(|| settings.effective_log_level());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;
    Ok(())
}

fn index_client(settings: &Settings) -> Result<ElasticClient> {
    let endpoint = settings.endpoint()?;
    let mut config = ElasticConfig::new(endpoint.index_url.as_str())
        .with_timeout(Duration::from_secs(settings.index.timeout_secs))
        .with_max_retries(settings.index.max_retries);
    if let Some(username) = &settings.index.username {
        config = config.with_basic_auth(username.as_str(), settings.index.password.clone());
    }
    ElasticClient::new(config).context("Failed to create index client")
}

fn dump_source(settings: &Settings) -> Result<DumpSource> {
    let endpoint = settings.endpoint()?;
    Ok(DumpSource::new(
        endpoint.expanded_source_root(),
        endpoint.directory_db.as_str(),
    ))
}

/// Run the full migration.
///
/// 1. Load configuration and apply CLI overrides
/// 2. Bind the dump source and index client for the selected environment
/// 3. Migrate, cancelling cleanly on Ctrl+C
/// 4. Print the report; fail on document failures or a failed consistency check
pub async fn run_migration(
    options: &GlobalOptions,
    keep_indices: bool,
    document_concurrency: Option<usize>,
    user_concurrency: Option<usize>,
    json: bool,
) -> Result<()> {
    let settings = load_settings(options)?;
    init_logging(&settings, options)?;

    let mut config = PipelineConfig::from_settings(&settings);
    if keep_indices {
        config = config.with_wipe_indices(false);
    }
    if let Some(n) = document_concurrency {
        config = config.with_document_concurrency(n);
    }
    if let Some(n) = user_concurrency {
        config = config.with_user_concurrency(n);
    }

    let endpoint = settings.endpoint()?;
    info!("Plex migration starting...");
    info!("Configuration:");
    info!("  Environment: {}", settings.environment);
    info!("  Source root: {}", endpoint.expanded_source_root().display());
    info!("  Directory db: {}", endpoint.directory_db);
    info!("  Index url: {}", endpoint.index_url);
    info!("  Wipe indices: {}", config.wipe_indices);

    let source = Arc::new(dump_source(&settings)?);
    let index_store = Arc::new(index_client(&settings)?);
    let migration = Migration::new(source.clone(), source, index_store, config)
        .with_progress(Arc::new(LoggingProgressCallback));

    let token = migration.cancellation_token();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, cancelling migration...");
            token.cancel();
        }
    });

    let report = migration.run().await.context("Migration failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    exit_status(&report)
}

/// Map a finished report onto the process exit: a failed consistency check
/// wins over failed document writes.
fn exit_status(report: &MigrationReport) -> Result<()> {
    report.ensure_consistent()?;
    if report.has_failures() {
        bail!("{} document(s) failed to index", report.failures.len());
    }
    Ok(())
}

fn print_report(report: &MigrationReport) {
    println!("Migration Report");
    println!("================");
    println!("Users processed: {}", report.users_processed);
    println!("Users ingested:  {}", report.non_empty_users());
    println!("Empty users:     {}", report.empty_users.len());
    for user_id in &report.empty_users {
        println!("  - {user_id}");
    }
    println!();
    println!("Documents indexed: {}", report.tally.indexed);
    println!("Documents skipped: {}", report.tally.skipped);
    println!("Documents failed:  {}", report.tally.failed);
    for failure in &report.failures {
        println!(
            "  - {}/{}/{}: {}",
            failure.user_id, failure.collection, failure.doc_id, failure.error
        );
    }

    if let Some(verification) = &report.verification {
        println!();
        println!("Index operations: {}", verification.indexed_total);
        println!("Size in bytes:    {}", verification.size_in_bytes);
        println!(
            "Indices:          {} (expected {})",
            verification.indices_present, verification.expected_indices
        );
        if let (Some(index), Some(count)) = (&verification.mapping_index, verification.mapping_count) {
            println!(
                "Mappings on {index}: {count} (expected {})",
                verification.expected_mappings
            );
        }
        if verification.passed() {
            println!("Consistency: OK");
        } else {
            for failure in &verification.failures {
                println!("Consistency: FAILED ({failure})");
            }
        }
    }
    println!();
    println!("Elapsed: {} ms", report.elapsed_ms());
}

/// Print the index cluster health; fail when the cluster is red.
pub async fn show_health(options: &GlobalOptions) -> Result<()> {
    let settings = load_settings(options)?;
    init_logging(&settings, options)?;

    let client = index_client(&settings)?;
    let health = client
        .cluster_health()
        .await
        .context("Failed to query cluster health")?;

    println!("Cluster: {}", health.cluster_name);
    println!("Status:  {}", health.status);
    println!("Nodes:   {}", health.number_of_nodes);

    if !health.is_ready() {
        bail!("Cluster {} is {}", health.cluster_name, health.status);
    }
    Ok(())
}

/// List directory users without migrating anything.
pub async fn list_users(options: &GlobalOptions) -> Result<()> {
    let settings = load_settings(options)?;
    init_logging(&settings, options)?;

    let source = dump_source(&settings)?;
    let users = source.list_users().await.context("Failed to list users")?;

    for user in &users {
        println!("{}\t{}\t{}", user.id, user.username, user.namespace());
    }
    println!("{} user(s)", users.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use plex_pipeline::{ConsistencyFailure, DocumentTally, FailedDocument, PipelineError, VerificationReport};
    use plex_types::EndpointSettings;

    fn settings_with_auth() -> Settings {
        let mut settings = Settings::default();
        settings.index.username = Some("elastic".to_string());
        settings.index.password = Some("changeme".to_string());
        settings
    }

    #[test]
    fn test_index_client_for_default_profile() {
        assert!(index_client(&settings_with_auth()).is_ok());
    }

    #[test]
    fn test_index_client_rejects_bad_url() {
        let mut settings = Settings::default();
        settings.environments.insert(
            "broken".to_string(),
            EndpointSettings {
                index_url: "not a url".to_string(),
                ..EndpointSettings::default()
            },
        );
        settings.environment = "broken".to_string();
        assert!(index_client(&settings).is_err());
    }

    #[test]
    fn test_unknown_environment() {
        let mut settings = Settings::default();
        settings.environment = "staging".to_string();
        assert!(dump_source(&settings).is_err());
    }

    #[tokio::test]
    async fn test_list_users_from_missing_dump_fails() {
        let dir = std::env::temp_dir().join("plex-migrate-missing-dump");
        let source = DumpSource::new(dir, "StreamDb001");
        assert!(source.list_users().await.is_err());
    }

    fn report(failures: Vec<FailedDocument>, verification: VerificationReport) -> MigrationReport {
        let now = Utc::now();
        MigrationReport {
            started_at: now,
            finished_at: now,
            users_processed: 1,
            empty_users: Vec::new(),
            tally: DocumentTally::default(),
            failures,
            verification: Some(verification),
        }
    }

    fn passing_verification() -> VerificationReport {
        VerificationReport {
            expected_indices: 1,
            indices_present: 1,
            ..VerificationReport::default()
        }
    }

    fn failed_write() -> FailedDocument {
        FailedDocument {
            user_id: "u1".to_string(),
            collection: "task".to_string(),
            doc_id: "t1".to_string(),
            error: "index write timed out after 30s".to_string(),
        }
    }

    #[test]
    fn test_exit_status_clean_run() {
        assert!(exit_status(&report(Vec::new(), passing_verification())).is_ok());
    }

    #[test]
    fn test_exit_status_failed_documents() {
        let err = exit_status(&report(vec![failed_write()], passing_verification())).unwrap_err();
        assert_eq!(err.to_string(), "1 document(s) failed to index");
    }

    #[test]
    fn test_exit_status_inconsistent_run() {
        let verification = VerificationReport {
            failures: vec![ConsistencyFailure::IndexCount { expected: 1, actual: 0 }],
            ..passing_verification()
        };
        let err = exit_status(&report(Vec::new(), verification)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Consistency(_))
        ));
    }

    #[test]
    fn test_exit_status_consistency_checked_first() {
        let verification = VerificationReport {
            failures: vec![ConsistencyFailure::IndexCount { expected: 2, actual: 1 }],
            ..passing_verification()
        };
        let err = exit_status(&report(vec![failed_write()], verification)).unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().is_some());
    }
}
