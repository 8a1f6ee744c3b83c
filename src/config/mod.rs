//! Configuration management
//!
//! This module loads node settings from an optional TOML file with
//! environment overrides for the node address and id.

pub mod settings;

pub use settings::{
    generate_node_id, Config, MiningSettings, NetworkSettings, NodeSettings, DEFAULT_NODE_ADDR,
};
