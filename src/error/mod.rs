//! Error handling for the ledger
//!
//! This module provides the error types shared by every ledger operation,
//! from signature checks to peer chain fetches.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error types for ledger operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Missing or malformed request fields
    InvalidInput(String),
    /// Transaction was not admitted because its signature did not check out
    InvalidSignature(String),
    /// Signing method has no signature scheme behind it
    InvalidMethod(String),
    /// Key material could not be parsed or does not match the scheme
    InvalidKey(String),
    /// Signature is well-formed input but does not verify
    VerificationFailed,
    /// Peer could not be reached or timed out
    PeerUnreachable(String),
    /// Peer answered with something that is not a chain
    PeerMalformedResponse(String),
    /// Candidate chain breaks a chain invariant
    ChainInvalid(String),
    /// Network communication errors
    Network(String),
    /// Configuration errors
    Config(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Poisoned lock on shared state
    Lock(String),
}

impl BlockchainError {
    /// Short machine-readable name, used in protocol error replies
    pub fn kind(&self) -> &'static str {
        match self {
            BlockchainError::InvalidInput(_) => "InvalidInput",
            BlockchainError::InvalidSignature(_) => "InvalidSignature",
            BlockchainError::InvalidMethod(_) => "InvalidMethod",
            BlockchainError::InvalidKey(_) => "InvalidKey",
            BlockchainError::VerificationFailed => "VerificationFailed",
            BlockchainError::PeerUnreachable(_) => "PeerUnreachable",
            BlockchainError::PeerMalformedResponse(_) => "PeerMalformedResponse",
            BlockchainError::ChainInvalid(_) => "ChainInvalid",
            BlockchainError::Network(_) => "Network",
            BlockchainError::Config(_) => "Config",
            BlockchainError::Crypto(_) => "Crypto",
            BlockchainError::Serialization(_) => "Serialization",
            BlockchainError::Io(_) => "Io",
            BlockchainError::Lock(_) => "Lock",
        }
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            BlockchainError::InvalidSignature(msg) => write!(f, "Invalid signature: {msg}"),
            BlockchainError::InvalidMethod(method) => {
                write!(f, "Invalid signing method: {method}")
            }
            BlockchainError::InvalidKey(msg) => write!(f, "Invalid key material: {msg}"),
            BlockchainError::VerificationFailed => write!(f, "Signature verification failed"),
            BlockchainError::PeerUnreachable(msg) => write!(f, "Peer unreachable: {msg}"),
            BlockchainError::PeerMalformedResponse(msg) => {
                write!(f, "Malformed peer response: {msg}")
            }
            BlockchainError::ChainInvalid(msg) => write!(f, "Invalid chain: {msg}"),
            BlockchainError::Network(msg) => write!(f, "Network error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Lock(msg) => write!(f, "Lock error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
