//! Configuration management for minechain

use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub miner: MinerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_file")]
    pub file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MinerConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
}

#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            file: default_ledger_file(),
        }
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            difficulty: default_difficulty(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            miner: MinerConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

fn default_ledger_file() -> String {
    "./ledger.json".to_string()
}

fn default_threads() -> usize {
    crate::miner::default_worker_count()
}

fn default_difficulty() -> usize {
    3
}

fn default_topic() -> String {
    "mine".to_string()
}

/// Load configuration from a toml file, falling back to defaults when the
/// file is absent.
pub fn load_config(path: &Path) -> Result<Config, ChainError> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)
            .map_err(|e| ChainError::ConfigError(format!("failed to parse {:?}: {}", path, e)))?
    };

    // Validate critical values
    if config.ledger.file.is_empty() {
        return Err(ChainError::ConfigError(
            "ledger.file must be set".to_string(),
        ));
    }
    if config.miner.threads == 0 {
        return Err(ChainError::ConfigError(
            "miner.threads must be at least 1".to_string(),
        ));
    }

    Ok(config)
}
