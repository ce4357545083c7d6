//! Node configuration, loaded from a TOML file with sensible defaults.

use std::path::Path;

use cerulean_miner::MinerConfig;
use cerulean_types::ChainConfig;
use color_eyre::eyre::{self, WrapErr};
use serde::{Deserialize, Serialize};

use crate::logging::{LogFormat, LogLevel};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Human-readable name for this node, used in logs only.
    pub moniker: String,
    pub chain: ChainConfig,
    pub miner: MinerConfig,
    pub network: NetworkSettings,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Ceiling on concurrently outstanding outbound requests.
    pub max_outstanding_requests: usize,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self { max_outstanding_requests: 16 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true, listen_addr: "127.0.0.1:9090".to_string() }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .wrap_err_with(|| format!("failed to parse config file {}", path.display()))
    }
}
