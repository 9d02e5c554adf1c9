//! Configuration loading for plex-migrate.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/plex-migrate/config.toml.
//! Environment variables use the `PLEX_` prefix and `__` between nested keys
//! (`PLEX_INDEX__PASSWORD`, `PLEX_ENVIRONMENTS__DEV__INDEX_URL`).

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::collection::CollectionSet;
use crate::error::PlexError;

/// Endpoints the run binds to for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSettings {
    /// Root directory of the exported source databases
    #[serde(default = "default_source_root")]
    pub source_root: String,

    /// Name of the directory database under `source_root`
    #[serde(default = "default_directory_db")]
    pub directory_db: String,

    /// Base URL of the search cluster
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// Log level used when this environment is selected
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_source_root() -> String {
    "./export".to_string()
}

fn default_directory_db() -> String {
    "StreamDb001".to_string()
}

fn default_index_url() -> String {
    "http://localhost:9200".to_string()
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            directory_db: default_directory_db(),
            index_url: default_index_url(),
            log_level: None,
        }
    }
}

impl EndpointSettings {
    fn profile(source_root: &str, index_url: &str, log_level: Option<&str>) -> Self {
        Self {
            source_root: source_root.to_string(),
            directory_db: default_directory_db(),
            index_url: index_url.to_string(),
            log_level: log_level.map(str::to_string),
        }
    }

    /// Expand ~ in source_root to the home directory
    pub fn expanded_source_root(&self) -> PathBuf {
        if let Some(rest) = self.source_root.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.source_root)
    }
}

/// Built-in environment profiles. The `dev` profiles log at debug level,
/// which turns on per-document reporting.
fn builtin_environments() -> BTreeMap<String, EndpointSettings> {
    BTreeMap::from([
        (
            "prod".to_string(),
            EndpointSettings::profile("/var/lib/plex/export", "http://localhost:9200", None),
        ),
        (
            "dev".to_string(),
            EndpointSettings::profile("./export/dev", "http://localhost:9200", Some("debug")),
        ),
        (
            "dev2".to_string(),
            EndpointSettings::profile("./export/dev2", "http://localhost:9201", Some("debug")),
        ),
    ])
}

/// Search cluster client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Basic-auth user name
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password (prefer PLEX_INDEX__PASSWORD over the config file)
    #[serde(default)]
    pub password: Option<String>,

    /// Attempts per request before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            max_retries: default_max_retries(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Selected environment profile
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Endpoint profiles by name
    #[serde(default = "builtin_environments")]
    pub environments: BTreeMap<String, EndpointSettings>,

    /// Search cluster client settings
    #[serde(default)]
    pub index: IndexSettings,

    /// Delete every index before migrating
    #[serde(default = "default_wipe_indices")]
    pub wipe_indices: bool,

    /// Documents of one collection in flight at once
    #[serde(default = "default_document_concurrency")]
    pub document_concurrency: usize,

    /// Users migrated at once
    #[serde(default = "default_user_concurrency")]
    pub user_concurrency: usize,

    /// Upper bound for any single store operation
    #[serde(default = "default_op_timeout")]
    pub op_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Collections migrated per user, in order
    #[serde(default)]
    pub collections: CollectionSet,
}

fn default_environment() -> String {
    "prod".to_string()
}

fn default_wipe_indices() -> bool {
    true
}

fn default_document_concurrency() -> usize {
    8
}

fn default_user_concurrency() -> usize {
    1
}

fn default_op_timeout() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            environments: builtin_environments(),
            index: IndexSettings::default(),
            wipe_indices: default_wipe_indices(),
            document_concurrency: default_document_concurrency(),
            user_concurrency: default_user_concurrency(),
            op_timeout_secs: default_op_timeout(),
            log_level: default_log_level(),
            collections: CollectionSet::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults (including the prod/dev/dev2 profiles)
    /// 2. Config file (~/.config/plex-migrate/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (PLEX_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, PlexError> {
        let config_dir = ProjectDirs::from("", "", "plex-migrate")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("environment", default_environment())
            .map_err(|e| PlexError::Config(e.to_string()))?
            .set_default("wipe_indices", default_wipe_indices())
            .map_err(|e| PlexError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| PlexError::Config(e.to_string()))?;

        // Profile keys are defaulted one by one so a file can override a single
        // endpoint without restating the whole profile.
        for (name, profile) in builtin_environments() {
            let key = |field: &str| format!("environments.{name}.{field}");
            builder = builder
                .set_default(key("source_root"), profile.source_root)
                .map_err(|e| PlexError::Config(e.to_string()))?
                .set_default(key("directory_db"), profile.directory_db)
                .map_err(|e| PlexError::Config(e.to_string()))?
                .set_default(key("index_url"), profile.index_url)
                .map_err(|e| PlexError::Config(e.to_string()))?;
            if let Some(level) = profile.log_level {
                builder = builder
                    .set_default(key("log_level"), level)
                    .map_err(|e| PlexError::Config(e.to_string()))?;
            }
        }

        builder = builder
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("PLEX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(|e| PlexError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlexError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PlexError> {
        if self.document_concurrency == 0 {
            return Err(PlexError::Config("document_concurrency must be > 0".to_string()));
        }
        if self.user_concurrency == 0 {
            return Err(PlexError::Config("user_concurrency must be > 0".to_string()));
        }
        if self.op_timeout_secs == 0 {
            return Err(PlexError::Config("op_timeout_secs must be > 0".to_string()));
        }
        self.collections
            .validate()
            .map_err(|e| PlexError::Config(e.to_string()))?;
        self.endpoint().map(|_| ())
    }

    /// Endpoints of the selected environment.
    pub fn endpoint(&self) -> Result<&EndpointSettings, PlexError> {
        self.environments.get(&self.environment).ok_or_else(|| {
            let known: Vec<&str> = self.environments.keys().map(String::as_str).collect();
            PlexError::Config(format!(
                "unknown environment '{}' (known: {})",
                self.environment,
                known.join(", ")
            ))
        })
    }

    /// Log level after applying the environment profile.
    pub fn effective_log_level(&self) -> &str {
        self.endpoint()
            .ok()
            .and_then(|e| e.log_level.as_deref())
            .unwrap_or(&self.log_level)
    }
}
