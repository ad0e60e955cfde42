//! Run configuration for the [`Deployer`](crate::deployer::Deployer).

use crate::errors::{CouplingError, CouplingResult};
use crate::time::Instant;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Time settings of a run, usually read from a TOML file.
///
/// ```toml
/// start_time = 0.0
/// end_time = 3.0
/// time_step = 86400.0
/// triggers = ["outlet"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployerConfig {
    /// First time of the run as a day count
    pub start_time: Instant,
    pub end_time: Instant,
    /// Length of a step in seconds
    pub time_step: f64,
    /// Run on the calling thread instead of a worker thread
    #[serde(default = "default_blocking")]
    pub blocking: bool,
    /// Triggers to pull every step. All triggers of the composition if empty.
    #[serde(default)]
    pub triggers: Vec<String>,
}

fn default_blocking() -> bool {
    true
}

impl DeployerConfig {
    pub fn new(start_time: f64, end_time: f64, time_step: f64) -> Self {
        Self {
            start_time: Instant(start_time),
            end_time: Instant(end_time),
            time_step,
            blocking: default_blocking(),
            triggers: vec![],
        }
    }

    pub fn from_toml_str(content: &str) -> CouplingResult<Self> {
        toml::from_str(content).map_err(|e| CouplingError::ConfigParse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> CouplingResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CouplingError::ConfigIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> CouplingResult<String> {
        toml::to_string(self).map_err(|e| CouplingError::ConfigParse(e.to_string()))
    }
}
