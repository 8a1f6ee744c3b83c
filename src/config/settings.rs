use crate::core::{ProofOfWork, DEFAULT_DIFFICULTY_TARGET, MINING_REWARD};
use crate::error::{BlockchainError, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_NODE_ADDR: &str = "127.0.0.1:5000";

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const NODE_ID_KEY: &str = "NODE_ID";

/// Node configuration, read from an optional TOML file
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeSettings,
    pub mining: MiningSettings,
    pub network: NetworkSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Address the server binds to
    pub address: String,
    /// Recipient of mining rewards; a fresh UUID when unset
    pub id: Option<String>,
}

impl Default for NodeSettings {
    fn default() -> Self {
        NodeSettings {
            address: DEFAULT_NODE_ADDR.to_string(),
            id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningSettings {
    pub difficulty_target: String,
    pub reward: u64,
}

impl Default for MiningSettings {
    fn default() -> Self {
        MiningSettings {
            difficulty_target: DEFAULT_DIFFICULTY_TARGET.to_string(),
            reward: MINING_REWARD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub peer_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// 0 disables background resolution
    pub resolve_interval_secs: u64,
    pub bootstrap_peers: Vec<String>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        NetworkSettings {
            peer_timeout_ms: 5000,
            request_timeout_ms: 120_000,
            resolve_interval_secs: 0,
            bootstrap_peers: Vec::new(),
        }
    }
}

impl Config {
    /// Defaults or the given file, then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        info!("Loaded configuration from {}", path.display());
        Config::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    /// `NODE_ADDRESS` and `NODE_ID` win over the file
    pub fn apply_env(&mut self) {
        self.apply_overrides(env::var(NODE_ADDRESS_KEY).ok(), env::var(NODE_ID_KEY).ok());
    }

    pub fn apply_overrides(&mut self, address: Option<String>, node_id: Option<String>) {
        if let Some(address) = address {
            self.node.address = address;
        }
        if let Some(node_id) = node_id {
            self.node.id = Some(node_id);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.node.address.parse::<SocketAddr>().map_err(|e| {
            BlockchainError::Config(format!(
                "Invalid node address {}: {e}",
                self.node.address
            ))
        })?;
        if let Some(id) = &self.node.id {
            if id.trim().is_empty() {
                return Err(BlockchainError::Config("Node id must not be empty".to_string()));
            }
        }
        ProofOfWork::new(&self.mining.difficulty_target)?;
        if self.network.peer_timeout_ms == 0 || self.network.request_timeout_ms == 0 {
            return Err(BlockchainError::Config(
                "Timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn proof_of_work(&self) -> Result<ProofOfWork> {
        ProofOfWork::new(&self.mining.difficulty_target)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.network.peer_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.network.request_timeout_ms)
    }

    pub fn resolve_interval(&self) -> Option<Duration> {
        match self.network.resolve_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Random node identifier: a UUID v4 without dashes
pub fn generate_node_id() -> String {
    Uuid::new_v4().simple().to_string()
}
