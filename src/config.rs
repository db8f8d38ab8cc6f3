//! Configuration management for warehouse insights.
//!
//! Handles loading configuration from TOML files and environment variables.
//! The warehouse settings end up in a [`WarehouseConfig`] value that is
//! handed to the client explicitly, so several differently configured
//! clients can live in one process.

use crate::error::{InsightsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::warehouse::{ExecutionContext, SERVICE_MAX_PAGE_SIZE};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Query engine settings.
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Documentation resources.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Limits applied at the tool boundary.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Query engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Workgroup queries run in.
    pub workgroup: String,

    /// Database used for unqualified table names.
    pub database: String,

    /// AWS region of the service.
    pub region: String,

    /// Endpoint override (a local emulator, or the gateway when a token is set).
    pub endpoint: Option<String>,

    /// Token for a signing gateway. When set, requests go to `endpoint`
    /// unsigned with this bearer token instead of through the AWS SDK.
    pub bearer_token: Option<String>,

    /// Largest page requested from the service.
    pub page_size: u32,

    /// Delay between status polls, in milliseconds.
    pub poll_interval_ms: u64,

    /// Local deadline for a query to finish, in seconds.
    pub timeout_secs: u64,

    /// Per-request HTTP timeout, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            workgroup: "primary".to_string(),
            database: "default".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            bearer_token: None,
            page_size: 100,
            poll_interval_ms: 1000,
            timeout_secs: 300,
            request_timeout_secs: 30,
        }
    }
}

impl WarehouseConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn execution_context(&self) -> ExecutionContext {
        ExecutionContext {
            database: self.database.clone(),
            workgroup: self.workgroup.clone(),
        }
    }

    /// Returns the endpoint override, if one is configured.
    pub fn endpoint_url(&self) -> Result<Option<Url>> {
        self.endpoint
            .as_deref()
            .map(|raw| {
                Url::parse(raw)
                    .map_err(|e| InsightsError::config(format!("Invalid endpoint '{raw}': {e}")))
            })
            .transpose()
    }

    /// Returns true when queries go through a bearer-token gateway.
    pub fn uses_gateway(&self) -> bool {
        self.bearer_token.is_some()
    }

    /// Applies `INSIGHTS_*` and `AWS_REGION` environment variables as overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(workgroup) = std::env::var("INSIGHTS_WORKGROUP") {
            self.workgroup = workgroup;
        }
        if let Ok(database) = std::env::var("INSIGHTS_DATABASE") {
            self.database = database;
        }
        if let Ok(region) = std::env::var("AWS_REGION") {
            self.region = region;
        }
        if let Ok(endpoint) = std::env::var("INSIGHTS_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Ok(token) = std::env::var("INSIGHTS_BEARER_TOKEN") {
            self.bearer_token = Some(token);
        }
    }

    /// Checks values the client relies on.
    pub fn validate(&self) -> Result<()> {
        if self.workgroup.trim().is_empty() {
            return Err(InsightsError::config("warehouse.workgroup must not be empty"));
        }
        if self.database.trim().is_empty() {
            return Err(InsightsError::config("warehouse.database must not be empty"));
        }
        if !(1..=SERVICE_MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(InsightsError::config(format!(
                "warehouse.page_size must be between 1 and {SERVICE_MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.timeout_secs == 0 {
            return Err(InsightsError::config("warehouse.timeout_secs must be positive"));
        }
        if self.endpoint_url()?.is_none() && self.uses_gateway() {
            return Err(InsightsError::config(
                "warehouse.endpoint must be set when a bearer token is configured",
            ));
        }
        Ok(())
    }

    /// Returns a display-safe string (no token) for logs.
    pub fn display_string(&self) -> String {
        format!(
            "{} @ {} ({})",
            self.database, self.workgroup, self.region
        )
    }
}

/// Documentation resource settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Directory holding catalog.txt, domain.txt, metrics.txt, examples.txt and queries/.
    pub dir: PathBuf,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("knowledge"),
        }
    }
}

/// Row limits applied to tool calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Upper bound for `run_query` rows.
    pub max_query_rows: usize,

    /// Upper bound for `get_sample_data` rows.
    pub max_sample_rows: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_query_rows: 100,
            max_sample_rows: 20,
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("warehouse-insights")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| InsightsError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            InsightsError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Loads the file, applies environment overrides, and validates the result.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.warehouse.apply_env_overrides();
        config.warehouse.validate()?;
        Ok(config)
    }
}
