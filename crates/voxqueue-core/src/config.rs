//! Application configuration: defaults, an optional TOML file, then the
//! environment.

use crate::error::{VoxqueueError, VoxqueueResult};
use crate::gateway::{GeminiConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Fallback environment variable for the API key
pub const API_KEY_FALLBACK_ENV: &str = "API_KEY";

/// Environment override for the model name
pub const MODEL_ENV: &str = "VOXQUEUE_MODEL";

/// Environment override for the service endpoint
pub const ENDPOINT_ENV: &str = "VOXQUEUE_ENDPOINT";

/// Voxqueue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Synthesis service API key
    pub api_key: Option<String>,
    /// Synthesis service base URL
    pub endpoint: String,
    /// Synthesis model
    pub model: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Voice used when none is given on the command line
    pub default_voice: Option<String>,
    /// Directory for exported files
    pub output_dir: PathBuf,
    /// File name of the bulk archive
    pub archive_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 60,
            default_voice: None,
            output_dir: PathBuf::from("."),
            archive_name: crate::DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

impl AppConfig {
    /// Platform config file location, e.g. `~/.config/voxqueue/config.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "Voxqueue", "voxqueue").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed TOML
    pub fn from_toml_str(contents: &str) -> VoxqueueResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Read a TOML file
    ///
    /// # Errors
    ///
    /// Returns a file error if it cannot be read and a configuration error
    /// if it is malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> VoxqueueResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            VoxqueueError::file(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit `path` must exist; otherwise the platform default file is
    /// used when present. Environment variables override file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the result
    /// fails validation
    pub fn load(path: Option<&Path>) -> VoxqueueResult<Self> {
        let mut config = match path {
            Some(path) => {
                info!("Loading config from {}", path.display());
                Self::from_file(path)?
            }
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(default) => {
                    info!("Loading config from {}", default.display());
                    Self::from_file(default)?
                }
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(key) = var(API_KEY_ENV).or_else(|| var(API_KEY_FALLBACK_ENV)) {
            self.api_key = Some(key);
        }
        if let Some(model) = var(MODEL_ENV) {
            self.model = model;
        }
        if let Some(endpoint) = var(ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid value
    pub fn validate(&self) -> VoxqueueResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(VoxqueueError::configuration("endpoint cannot be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(VoxqueueError::configuration("model cannot be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(VoxqueueError::configuration(
                "request_timeout_secs must be greater than 0",
            ));
        }
        if !self.archive_name.to_lowercase().ends_with(".zip") {
            return Err(VoxqueueError::configuration(format!(
                "archive_name must end in .zip, got '{}'",
                self.archive_name
            )));
        }
        Ok(())
    }

    /// Gateway settings derived from this configuration
    #[must_use]
    pub fn gateway_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.clone(),
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Full path of the bulk archive
    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(&self.archive_name)
    }
}
