//! `CloneConfig`: the external configuration surface (§6), loaded from TOML.

use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::time::Duration;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_send_timeout_ms() -> u64 {
    2_000
}

fn default_snapshot_batch_size() -> usize {
    10
}

/// A constraint selected by configuration rather than wired up in code.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConstraintConfig {
    SingleValued { property: String },
}

/// Configuration for one clone, bound from the §6 keys.
#[derive(Debug, Clone, Deserialize)]
pub struct CloneConfig {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@domain")]
    pub domain: String,
    #[serde(default)]
    pub genesis: bool,
    #[serde(default)]
    pub constraints: Vec<ConstraintConfig>,
    #[serde(rename = "logLevel", default = "default_log_level")]
    pub log_level: String,
    #[serde(rename = "sendTimeout", default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    #[serde(default = "default_snapshot_batch_size")]
    pub snapshot_batch_size: usize,
}

impl CloneConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(EngineError::from)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}
