//! # Configuration
//!
//! JSON configuration of the demo application. Every field has a default,
//! so an empty object `{}` is a valid configuration.
//!
//! ```json
//! {
//!   "multicast": {
//!     "include_original": true,
//!     "prune_released": true,
//!     "reassign_on_change": true
//!   },
//!   "logging": {
//!     "level": "info",
//!     "file_path": "./logs",
//!     "disable_terminal": false
//!   },
//!   "scenario": {
//!     "rows": 40,
//!     "drag_distance": 240.0,
//!     "selected_row": 3
//!   }
//! }
//! ```
//!
//! Values are taken, lowest priority first, from the defaults, the file and
//! the command line.

use std::path::Path;

use derive_builder::UninitializedFieldError;
use eyre::Report;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{app::multicast::MulticastConfig, cli::Cli};

#[derive(Debug, Error)]
pub enum ConfigBuildError {
    #[error("Configuration missing or invalid `{0}`")]
    UninitializedField(&'static str),
    #[error("Configuration error `{0}`")]
    Other(String),
    #[error("Configuration file error: {0}")]
    FileError(String),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

impl From<UninitializedFieldError> for ConfigBuildError {
    fn from(err: UninitializedFieldError) -> Self {
        ConfigBuildError::UninitializedField(err.field_name())
    }
}

impl From<Report> for ConfigBuildError {
    fn from(report: Report) -> Self {
        ConfigBuildError::Other(format!("{:?}", report))
    }
}

impl From<std::io::Error> for ConfigBuildError {
    fn from(err: std::io::Error) -> Self {
        ConfigBuildError::FileError(format!("IO error: {:?}", err))
    }
}

impl From<serde_json::Error> for ConfigBuildError {
    fn from(err: serde_json::Error) -> Self {
        ConfigBuildError::FileError(format!("JSON parsing error: {}", err))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default)]
    pub multicast: MulticastConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub scenario: ScenarioSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory of the rolling log file (optional)
    pub file_path: Option<String>,
    #[serde(default)]
    pub disable_terminal: bool,
}

/// Parameters of the scripted demo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSettings {
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_drag_distance")]
    pub drag_distance: f64,
    #[serde(default = "default_selected_row")]
    pub selected_row: usize,
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_rows() -> usize {
    40
}

fn default_drag_distance() -> f64 {
    240.0
}

fn default_selected_row() -> usize {
    3
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_path: None,
            disable_terminal: false,
        }
    }
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            drag_distance: default_drag_distance(),
            selected_row: default_selected_row(),
        }
    }
}

impl ApplicationConfig {
    /// Reads and validates a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigBuildError> {
        if !path.exists() {
            return Err(ConfigBuildError::FileError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;

        tracing::info!(file_path = %path.display(), "Loading configuration from file");

        let config: ApplicationConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
        if let Some(log_path) = &cli.log_path {
            self.logging.file_path = Some(log_path.clone());
        }
        if cli.term_log_off {
            self.logging.disable_terminal = true;
        }
        if cli.no_original {
            self.multicast.include_original = false;
        }
        if cli.keep_released {
            self.multicast.prune_released = false;
        }
        if cli.no_reassign {
            self.multicast.reassign_on_change = false;
        }
        if let Some(rows) = cli.rows {
            self.scenario.rows = rows;
        }
        if let Some(drag_distance) = cli.drag_distance {
            self.scenario.drag_distance = drag_distance;
        }
        if let Some(selected_row) = cli.selected_row {
            self.scenario.selected_row = selected_row;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigBuildError> {
        if self.scenario.rows == 0 {
            return Err(ConfigBuildError::ValidationError(String::from(
                "scenario.rows must be positive",
            )));
        }
        if self.scenario.selected_row >= self.scenario.rows {
            return Err(ConfigBuildError::ValidationError(format!(
                "scenario.selected_row {} out of range ({} rows)",
                self.scenario.selected_row, self.scenario.rows
            )));
        }
        if !self.scenario.drag_distance.is_finite() {
            return Err(ConfigBuildError::ValidationError(String::from(
                "scenario.drag_distance must be finite",
            )));
        }
        Ok(())
    }

    /// Filter directive for the log subscriber.
    pub fn log_filter(&self) -> String {
        format!(
            "{}={},delegate_core={}",
            env!("CARGO_CRATE_NAME"),
            self.logging.level,
            self.logging.level
        )
    }
}
