use crate::DbError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_ADMIN_DATABASE: &str = "master";
pub const DEFAULT_MENU_TARGET_PATH: &str = "Server/Database";
pub const DEFAULT_MENU_ITEM_LABEL: &str = "Open in dbscout";

/// Databases that are never offered as catalog entries.
pub const SYSTEM_DATABASES: &[&str] = &["master", "model", "tempdb", "msdb", "Resource"];

/// How a discovery pass reacts when one server fails to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and keep enumerating the remaining servers.
    #[default]
    IsolateServers,

    /// Stop the pass at the first failing server.
    AbortPass,
}

/// How the catalog resolves two descriptors with the same connection string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    KeepFirst,
    Overwrite,

    /// Keep the existing entry and report the server as failed. The server's
    /// other databases are still added.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub query_timeout_ms: u64,
    pub admin_database: String,
    pub excluded_databases: Vec<String>,
    pub failure_policy: FailurePolicy,
    pub duplicate_policy: DuplicatePolicy,
    pub menu_target_path: String,
    pub menu_item_label: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            admin_database: DEFAULT_ADMIN_DATABASE.to_string(),
            excluded_databases: SYSTEM_DATABASES.iter().map(|s| s.to_string()).collect(),
            failure_policy: FailurePolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
            menu_target_path: DEFAULT_MENU_TARGET_PATH.to_string(),
            menu_item_label: DEFAULT_MENU_ITEM_LABEL.to_string(),
        }
    }
}

impl DiscoveryConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Reads `DiscoveryConfig` from `<config dir>/dbscout/config.json`.
pub struct DiscoveryConfigStore {
    path: PathBuf,
}

impl DiscoveryConfigStore {
    pub fn new() -> Result<Self, DbError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            DbError::IoError(std::io::Error::other("Could not find config directory"))
        })?;

        Ok(Self {
            path: config_dir.join("dbscout").join("config.json"),
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the config, falling back to defaults when the file is missing.
    pub fn load(&self) -> Result<DiscoveryConfig, DbError> {
        if !self.path.exists() {
            return Ok(DiscoveryConfig::default());
        }

        let content = fs::read_to_string(&self.path).map_err(DbError::IoError)?;
        let config: DiscoveryConfig =
            serde_json::from_str(&content).map_err(|e| DbError::InvalidConfig(e.to_string()))?;

        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
