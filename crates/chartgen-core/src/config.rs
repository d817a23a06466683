//! Generation run configuration
//!
//! Loaded from a YAML file such as:
//!
//! ```yaml
//! chartName: shop
//! threshold: 2048
//! filesDir: files
//! externalizeLabel: chartgen.io/externalize
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Default size (bytes of raw content) at which values are externalized
pub const DEFAULT_THRESHOLD: usize = 1024;

/// Default directory, relative to the chart root, for externalized files
pub const DEFAULT_FILES_DIR: &str = "files";

/// Default label that forces externalization of a ConfigMap's data
pub const DEFAULT_EXTERNALIZE_LABEL: &str = "chartgen.io/externalize";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Name of the chart being generated
    #[serde(default = "default_chart_name")]
    pub chart_name: String,

    /// Values of at least this many bytes are externalized
    #[serde(default = "default_threshold")]
    pub threshold: usize,

    /// Directory prefix of externalized file paths
    #[serde(default = "default_files_dir")]
    pub files_dir: String,

    /// Label that marks ConfigMaps whose data is always externalized
    #[serde(default = "default_externalize_label")]
    pub externalize_label: String,
}

fn default_chart_name() -> String {
    "chart".to_string()
}

fn default_threshold() -> usize {
    DEFAULT_THRESHOLD
}

fn default_files_dir() -> String {
    DEFAULT_FILES_DIR.to_string()
}

fn default_externalize_label() -> String {
    DEFAULT_EXTERNALIZE_LABEL.to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            chart_name: default_chart_name(),
            threshold: default_threshold(),
            files_dir: default_files_dir(),
            externalize_label: default_externalize_label(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(invalid("threshold must be greater than zero"));
        }
        if self.chart_name.trim().is_empty() {
            return Err(invalid("chartName must not be empty"));
        }
        if self.files_dir.trim().is_empty() {
            return Err(invalid("filesDir must not be empty"));
        }
        if self.files_dir.starts_with('/') || self.files_dir.split('/').any(|s| s == "..") {
            return Err(invalid("filesDir must be a relative path inside the chart"));
        }
        if self.externalize_label.trim().is_empty() {
            return Err(invalid("externalizeLabel must not be empty"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> CoreError {
    CoreError::InvalidConfig {
        message: message.to_string(),
    }
}
