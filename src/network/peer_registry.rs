use crate::error::{BlockchainError, Result};
use log::info;
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard};

/// Set of known peer addresses, canonicalised to `host:port`
///
/// Peers are only ever added; there is no eviction.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashSet<String>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer given as `scheme://host:port[/path]` or `host:port`
    ///
    /// Returns the canonical form that was stored. Registering the same peer
    /// twice is a no-op.
    pub fn register(&self, address: &str) -> Result<String> {
        let canonical = canonicalize(address)?;

        let mut peers = self
            .peers
            .write()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire peer lock: {e}")))?;
        if peers.insert(canonical.clone()) {
            info!("Registered peer {canonical}");
        }
        Ok(canonical)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashSet<String>>> {
        self.peers
            .read()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire peer lock: {e}")))
    }

    /// Sorted snapshot of every registered peer
    pub fn peers(&self) -> Result<Vec<String>> {
        let mut peers: Vec<String> = self.read()?.iter().cloned().collect();
        peers.sort();
        Ok(peers)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    pub fn contains(&self, address: &str) -> Result<bool> {
        let canonical = canonicalize(address)?;
        Ok(self.read()?.contains(&canonical))
    }
}

/// Reduce an address to lowercase `host:port`
pub fn canonicalize(address: &str) -> Result<String> {
    let invalid = |reason: &str| {
        BlockchainError::InvalidInput(format!("Invalid peer address '{address}': {reason}"))
    };

    let trimmed = address.trim();
    let without_scheme = match trimmed.split_once("://") {
        Some((scheme, rest)) => {
            if scheme.is_empty()
                || !scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
            {
                return Err(invalid("malformed scheme"));
            }
            rest
        }
        None => trimmed,
    };

    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or_default();

    let (host, port) = authority
        .rsplit_once(':')
        .ok_or_else(|| invalid("missing port"))?;

    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    if host.chars().any(|c| c.is_whitespace()) {
        return Err(invalid("host contains whitespace"));
    }
    if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("port must be numeric"));
    }
    let port: u16 = port.parse().map_err(|_| invalid("port out of range"))?;

    Ok(format!("{}:{port}", host.to_ascii_lowercase()))
}
