//! # Proof Ledger
//!
//! A single-node proof-of-work ledger that talks to its peers over a small
//! JSON protocol and settles disagreements with the longest valid chain.
//!
//! ## What is in here
//! - **Ledger**: an in-memory chain plus a pool of signed transactions
//!   waiting for the next block
//! - **Proof of work**: find a proof whose SHA-256 with the previous proof
//!   starts with the difficulty target
//! - **Signatures**: RSA (PKCS#1 v1.5, SHA-256) and DSA over the canonical
//!   `(sender, recipient, amount)` payload
//! - **Consensus**: fetch every peer's chain, adopt the longest one that
//!   validates
//!
//! ## Layout
//! - `core/`: blocks, transactions, proof of work, ledger, consensus
//! - `crypto/`: signing methods and their schemes
//! - `network/`: peer registry, protocol messages, TCP client and server
//! - `config/`: TOML configuration with environment overrides
//! - `utils/`: hashing, canonical JSON and serde helpers
//! - `cli/`: command-line arguments
//!
//! Block hashes are SHA-256 over JSON with keys sorted at every level, so
//! two nodes agree on a block's hash no matter how it was serialized.

pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod network;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    check_chain, validate_chain, Block, ChainSnapshot, ChainSource, ConsensusResolver, Ledger,
    ProofOfWork, Transaction,
};
pub use crypto::{
    DsaParams, PrivateKeyMaterial, PublicKeyMaterial, Signature, SignatureScheme, SigningMethod,
};
pub use error::{BlockchainError, Result};
pub use network::{NodeContext, Package, PeerRegistry, Server, TcpChainSource};
pub use utils::{canonical_json, current_timestamp, sha256_digest, sha256_hex};
