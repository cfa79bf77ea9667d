//! Configuration management for picochain

use crate::blockchain::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD};
use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub chain: ChainConfig,
}

#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL this node hands out to peers, e.g. "http://localhost:3001".
    /// Derived from the port when not set.
    #[serde(default)]
    pub advertise_url: Option<String>,
    #[serde(default = "default_registry_path")]
    pub registry_path: String,
}

#[derive(Debug, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_mining_reward")]
    pub mining_reward: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            port: default_port(),
            advertise_url: None,
            registry_path: default_registry_path(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
        }
    }
}

impl Config {
    /// The URL peers should use to reach this node.
    pub fn base_url(&self) -> String {
        self.network
            .advertise_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.network.port))
    }
}

fn default_port() -> u16 {
    3001
}

fn default_registry_path() -> String {
    "nodes.json".to_string()
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_mining_reward() -> u64 {
    DEFAULT_MINING_REWARD
}

/// Loads configuration from a TOML file. An absent file yields the defaults;
/// a present but malformed file is an error.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        Config {
            network: NetworkConfig::default(),
            chain: ChainConfig::default(),
        }
    } else {
        toml::from_str(&config_str).map_err(|e| ChainError::Config(e.to_string()))?
    };

    if config.chain.difficulty == 0 {
        return Err(ChainError::Config(
            "chain.difficulty must be at least 1".to_string(),
        ));
    }

    Ok(config)
}
