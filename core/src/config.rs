//! Configuration types for the validation engine

use crate::error::{GraphGuardError, Result};
use crate::types::DEFAULT_GROUP;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphGuardConfig {
    /// Traversal and execution configuration
    pub validation: ValidationConfig,

    /// Metadata building configuration
    pub metadata: MetadataConfig,
}

/// Traversal and execution configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Stop the call after the first violation
    pub fail_fast: bool,

    /// Maximum cascade depth before the call aborts
    pub max_cascade_depth: usize,

    /// Group used when a call requests none
    pub default_group: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            max_cascade_depth: 512,
            default_group: DEFAULT_GROUP.to_string(),
        }
    }
}

/// Metadata building configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetadataConfig {
    /// Share compiled patterns process-wide, keyed by pattern and flags
    pub cache_patterns: bool,

    /// Run override consistency checks when building executables
    pub check_overrides: bool,

    /// Descriptor builds slower than this are logged as warnings
    #[serde(with = "humantime_serde")]
    pub slow_build_threshold: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            cache_patterns: true,
            check_overrides: true,
            slow_build_threshold: Duration::from_millis(50),
        }
    }
}

impl GraphGuardConfig {
    /// Parse a `YAML` configuration
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed input or a configuration error
    /// when [`GraphGuardConfig::validate`] rejects the settings.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| {
            GraphGuardError::parse_at(
                format!("YAML configuration error: {e}"),
                e.location().map_or_else(
                    || "unknown location".to_string(),
                    |l| format!("line {}, column {}", l.line(), l.column()),
                ),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a `JSON` configuration
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed input or a configuration error
    /// when [`GraphGuardConfig::validate`] rejects the settings.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| GraphGuardError::parse(format!("JSON configuration error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are read as `JSON`, anything else as `YAML`
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, otherwise as
    /// [`GraphGuardConfig::from_yaml_str`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        tracing::debug!(path = %path.display(), "loading configuration");
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Reject inconsistent settings
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.validation.max_cascade_depth == 0 {
            return Err(GraphGuardError::config(
                "validation.max_cascade_depth must be at least 1",
            ));
        }
        if self.validation.default_group.trim().is_empty() {
            return Err(GraphGuardError::config(
                "validation.default_group must not be empty",
            ));
        }
        Ok(())
    }
}
