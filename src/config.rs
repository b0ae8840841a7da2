//! YAML configuration for maskmatch runs.
//!
//! One file configures the registrar, the fuzzy area matcher, the split
//! pipeline and logging. Every section and field is optional.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "downtown addresses"
//!
//! registrar:
//!   buffer_distance: 3.0
//!   coordinate_space: geographic   # metres over lon/lat input; or: planar
//!
//! fuzzy:
//!   tolerance: 0.01
//!   assume_full_coverage: true
//!
//! pipeline:
//!   mask_source: "json/buildings.geojson"
//!   on_topology_error: abort       # or: report
//!
//! log:
//!   level: "info"
//!   json: false
//! ```
//!
//! `MASKMATCH_BUFFER_DISTANCE`, `MASKMATCH_TOLERANCE` and
//! `MASKMATCH_MASK_SOURCE` override the file when set, see
//! [`MaskmatchConfig::apply_env`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use matcher::{CoordinateSpace, FuzzyConfig, RegistrarConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::TopologyPolicy;

pub const ENV_BUFFER_DISTANCE: &str = "MASKMATCH_BUFFER_DISTANCE";
pub const ENV_TOLERANCE: &str = "MASKMATCH_TOLERANCE";
pub const ENV_MASK_SOURCE: &str = "MASKMATCH_MASK_SOURCE";

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidOverride { key: String, value: String },
}

/// Top-level YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct MaskmatchConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub registrar: RegistrarYamlConfig,

    #[serde(default)]
    pub fuzzy: FuzzyYamlConfig,

    #[serde(default)]
    pub pipeline: PipelineYamlConfig,

    #[serde(default)]
    pub log: LogYamlConfig,

    /// Fallback values for the `MASKMATCH_*` variables, consulted when the
    /// process environment does not set them.
    #[serde(default)]
    pub env_overrides: HashMap<String, String>,
}

impl MaskmatchConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: MaskmatchConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.registrar.validate()?;
        self.fuzzy.validate()?;
        self.log.validate()?;

        Ok(())
    }

    /// Apply `MASKMATCH_*` overrides from the process environment, falling
    /// back to [`env_overrides`](Self::env_overrides), then re-validate.
    pub fn apply_env(&mut self) -> Result<(), ConfigLoadError> {
        let fallback = self.env_overrides.clone();
        self.apply_overrides(|key| std::env::var(key).ok().or_else(|| fallback.get(key).cloned()))
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_BUFFER_DISTANCE) {
            self.registrar.buffer_distance = parse_override(ENV_BUFFER_DISTANCE, &value)?;
        }
        if let Some(value) = lookup(ENV_TOLERANCE) {
            self.fuzzy.tolerance = parse_override(ENV_TOLERANCE, &value)?;
        }
        if let Some(value) = lookup(ENV_MASK_SOURCE) {
            self.pipeline.mask_source = Some(value);
        }
        self.validate()
    }

    pub fn registrar_config(&self) -> RegistrarConfig {
        RegistrarConfig {
            buffer_distance: self.registrar.buffer_distance,
            coordinate_space: self.registrar.coordinate_space,
        }
    }

    pub fn fuzzy_config(&self) -> FuzzyConfig {
        FuzzyConfig {
            tolerance: self.fuzzy.tolerance,
            assume_full_coverage: self.fuzzy.assume_full_coverage,
        }
    }
}

impl Default for MaskmatchConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            registrar: RegistrarYamlConfig::default(),
            fuzzy: FuzzyYamlConfig::default(),
            pipeline: PipelineYamlConfig::default(),
            log: LogYamlConfig::default(),
            env_overrides: HashMap::new(),
        }
    }
}

fn parse_override(key: &str, value: &str) -> Result<f64, ConfigLoadError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigLoadError::InvalidOverride {
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// Registrar YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrarYamlConfig {
    #[serde(default = "default_buffer_distance")]
    pub buffer_distance: f64,

    #[serde(default)]
    pub coordinate_space: CoordinateSpace,
}

impl RegistrarYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if !self.buffer_distance.is_finite() || self.buffer_distance < 0.0 {
            return Err(ConfigLoadError::Validation(
                "registrar.buffer_distance must be a finite value >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RegistrarYamlConfig {
    fn default() -> Self {
        Self {
            buffer_distance: default_buffer_distance(),
            coordinate_space: CoordinateSpace::Geographic,
        }
    }
}

/// Fuzzy area matcher YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuzzyYamlConfig {
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default = "true_value")]
    pub assume_full_coverage: bool,
}

impl FuzzyYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if !(0.0..=1.0).contains(&self.tolerance) {
            return Err(ConfigLoadError::Validation(
                "fuzzy.tolerance must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FuzzyYamlConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            assume_full_coverage: true,
        }
    }
}

/// Split pipeline YAML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineYamlConfig {
    /// Mask collection used when the command line names none.
    #[serde(default)]
    pub mask_source: Option<String>,

    #[serde(default)]
    pub on_topology_error: TopologyPolicy,
}

/// Logging YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogYamlConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl LogYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "log.level must be one of: {valid_levels:?}"
            )));
        }
        Ok(())
    }
}

impl Default for LogYamlConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Helper functions for serde defaults
fn default_version() -> String {
    "1.0".to_string()
}
fn default_buffer_distance() -> f64 {
    3.0
}
fn default_tolerance() -> f64 {
    0.01
}
fn true_value() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
