//! Configuration for the SQL Server MCP
//!
//! Configuration is loaded from, lowest priority first:
//! 1. Default values
//! 2. `MSSQL_CONFIG_PATH`, or `~/.binks/mssql.toml`
//! 3. `DB_*` environment variables

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::gate::PolicyConfig;
use crate::types::MssqlError;

/// Values accepted as "true" for boolean environment variables
const TRUTHY: [&str; 4] = ["true", "1", "yes", "y"];

/// SQL Server MCP configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MssqlConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub policy: PolicySettings,
}

/// Server connection settings
#[derive(Clone, Deserialize)]
pub struct ConnectionConfig {
    /// `host` or `host,port`, optionally prefixed with `tcp:`
    #[serde(default = "default_data_source")]
    pub data_source: String,

    /// Database the connection opens in; the pinned database when
    /// multi-database mode is off
    #[serde(default)]
    pub initial_catalog: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Skip server certificate validation
    /// Default: true
    #[serde(default = "default_true")]
    pub trust_server_certificate: bool,

    /// Upper bound on a single database round trip, in seconds
    /// Default: 30
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

// Keeps the password out of logs
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("data_source", &self.data_source)
            .field("initial_catalog", &self.initial_catalog)
            .field("user", &self.user)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

/// Access policy switches
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicySettings {
    /// Allow targeting databases other than `initial_catalog`
    /// Default: false
    #[serde(default)]
    pub allow_multi_database: bool,

    /// Allow non-SELECT statements
    /// Default: false (read-only)
    #[serde(default)]
    pub allow_write: bool,
}

fn default_data_source() -> String {
    "localhost".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            data_source: default_data_source(),
            initial_catalog: String::new(),
            user: String::new(),
            password: String::new(),
            trust_server_certificate: default_true(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ConnectionConfig {
    /// Reject settings that would make every call fail
    pub fn validate(&self) -> Result<(), MssqlError> {
        if self.timeout_secs == 0 {
            return Err(MssqlError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl MssqlConfig {
    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from: {}", path.display());
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config from {:?}", path))?;
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config from {:?}", path))?
            }
            _ => {
                tracing::info!("Config file not found, using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.connection.validate()?;

        Ok(config)
    }

    /// Apply `DB_*` overrides from a variable lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("DB_DATASOURCE") {
            self.connection.data_source = value;
        }
        if let Some(value) = lookup("DB_INITIAL_CATALOG") {
            self.connection.initial_catalog = value;
        }
        if let Some(value) = lookup("DB_USER") {
            self.connection.user = value;
        }
        if let Some(value) = lookup("DB_PASSWORD") {
            self.connection.password = value;
        }
        if let Some(value) = lookup("DB_ALLOW_MULTI") {
            self.policy.allow_multi_database = is_truthy(&value);
        }
        if let Some(value) = lookup("DB_ALLOW_WRITE") {
            self.policy.allow_write = is_truthy(&value);
        }

        // The gate compares against the trimmed name; the connection must open the same one
        self.connection.initial_catalog = self.connection.initial_catalog.trim().to_string();
    }

    /// Immutable gate policy; the initial catalog is the pinned database
    pub fn policy(&self) -> Result<PolicyConfig, MssqlError> {
        Ok(PolicyConfig::new(
            self.policy.allow_multi_database,
            self.policy.allow_write,
            self.connection.initial_catalog.as_str(),
        )?)
    }

    fn find_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("MSSQL_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }

        dirs::home_dir().map(|home| home.join(".binks").join("mssql.toml"))
    }
}

fn is_truthy(value: &str) -> bool {
    TRUTHY.contains(&value.trim().to_lowercase().as_str())
}
