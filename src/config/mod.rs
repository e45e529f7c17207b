use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::infrastructure::error::ReviewError;
use crate::infrastructure::logging::LoggingSettings;
use crate::instance::parse_instance_arn;
use crate::orchestrator::OrchestratorConfig;
use crate::report::ReportSettings;
use crate::storage::backends::BackendType;
use crate::storage::StorageSettings;

const DEFAULT_CONFIG_FILE: &str = "ops-review.toml";

/// Run-level defaults not tied to any one subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Review window used when the command line does not pass one.
    pub default_days_back: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_days_back: 14,
        }
    }
}

/// Identity of the instance under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// ARN-form identifier of the instance.
    pub instance_arn: String,
    /// Base URL of the admin API gateway the analyzers pull from.
    pub api_base_url: String,
    /// Flow log group; log analysis needs it, everything else ignores it.
    pub log_group: Option<String>,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            instance_arn: String::new(),
            api_base_url: String::new(),
            log_group: None,
        }
    }
}

/// Top-level configuration: a TOML file with one section per concern, with
/// environment overrides applied on top. Command-line flags override both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub instance: InstanceConfig,
    pub storage: StorageSettings,
    pub orchestrator: OrchestratorConfig,
    pub report: ReportSettings,
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from the given file, or from `ops-review.toml` in
    /// the working directory when present, falling back to defaults. An
    /// explicitly named file must exist and parse; the implicit one is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ReviewError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ReviewError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReviewError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            ReviewError::config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Environment variables override file values, matching the file's
    /// section structure with an `OPS_REVIEW_` prefix.
    fn apply_env_overrides(&mut self) {
        if let Ok(arn) = env::var("OPS_REVIEW_INSTANCE_ARN") {
            self.instance.instance_arn = arn;
        }
        if let Ok(url) = env::var("OPS_REVIEW_API_BASE_URL") {
            self.instance.api_base_url = url;
        }
        if let Ok(log_group) = env::var("OPS_REVIEW_LOG_GROUP") {
            self.instance.log_group = Some(log_group);
        }
        if let Ok(backend) = env::var("OPS_REVIEW_STORAGE_BACKEND") {
            match backend.as_str() {
                "object-store" => self.storage.backend = BackendType::ObjectStore,
                "key-value-table" => self.storage.backend = BackendType::KeyValueTable,
                other => warn!(backend = other, "ignoring unknown storage backend override"),
            }
        }
        if let Ok(level) = env::var("OPS_REVIEW_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ReviewError> {
        if self.instance.instance_arn.is_empty() {
            return Err(ReviewError::config(
                "instance.instance_arn is required; set it in the config file or OPS_REVIEW_INSTANCE_ARN",
            ));
        }
        parse_instance_arn(&self.instance.instance_arn)?;

        if self.instance.api_base_url.is_empty() {
            return Err(ReviewError::config(
                "instance.api_base_url is required; set it in the config file or OPS_REVIEW_API_BASE_URL",
            ));
        }

        if self.storage.retention_days <= 0 {
            return Err(ReviewError::config(
                "storage.retention_days must be positive",
            ));
        }
        if self.general.default_days_back == 0 {
            return Err(ReviewError::config(
                "general.default_days_back must be at least 1",
            ));
        }
        if self.orchestrator.max_days_back == 0 {
            return Err(ReviewError::config(
                "orchestrator.max_days_back must be at least 1",
            ));
        }
        if self.orchestrator.run_timeout_seconds == 0 {
            return Err(ReviewError::config(
                "orchestrator.run_timeout_seconds must be positive",
            ));
        }

        Ok(())
    }
}
