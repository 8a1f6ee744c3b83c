//! Test utilities for ledger testing

use crate::core::{Block, ChainSnapshot, ChainSource, Ledger, ProofOfWork};
use crate::crypto::{DsaParams, PrivateKeyMaterial, SigningMethod};
use crate::error::{BlockchainError, Result};
use std::collections::HashMap;

/// Easier than the default target so unit tests mine quickly
pub const TEST_DIFFICULTY_TARGET: &str = "000";

const RSA_PRIVATE_KEY_HEX: &str = include_str!("../../tests/fixtures/rsa_private_key.hex");
const DSA_KEY_TOML: &str = include_str!("../../tests/fixtures/dsa_key.toml");

/// 2048-bit PKCS#1 RSA key from the fixtures
pub fn rsa_private_key() -> PrivateKeyMaterial {
    PrivateKeyMaterial::from_key_text(SigningMethod::Rsa, RSA_PRIVATE_KEY_HEX).unwrap()
}

/// 1024-bit DSA group with a 224-bit subgroup
pub fn dsa_private_key() -> PrivateKeyMaterial {
    PrivateKeyMaterial::from_key_text(SigningMethod::Dsa, DSA_KEY_TOML).unwrap()
}

pub fn dsa_params() -> DsaParams {
    match dsa_private_key() {
        PrivateKeyMaterial::Dsa { ref params, .. } => params.clone(),
        PrivateKeyMaterial::Rsa { .. } => unreachable!("fixture holds a DSA key"),
    }
}

/// Fresh ledger at the test difficulty
pub fn create_test_ledger(node_id: &str) -> Ledger {
    let pow = ProofOfWork::new(TEST_DIFFICULTY_TARGET).unwrap();
    Ledger::new(node_id, pow).unwrap()
}

pub fn mine_blocks(ledger: &Ledger, count: usize) -> Vec<Block> {
    (0..count).map(|_| ledger.mine().unwrap()).collect()
}

/// In-memory chain source; unknown peers are unreachable
#[derive(Default)]
pub struct StaticChainSource {
    snapshots: HashMap<String, ChainSnapshot>,
}

impl StaticChainSource {
    pub fn with_chain(self, peer: &str, chain: Vec<Block>) -> Self {
        self.with_snapshot(peer, ChainSnapshot::new(chain))
    }

    pub fn with_snapshot(mut self, peer: &str, snapshot: ChainSnapshot) -> Self {
        self.snapshots.insert(peer.to_string(), snapshot);
        self
    }
}

impl ChainSource for StaticChainSource {
    fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot> {
        self.snapshots
            .get(peer)
            .cloned()
            .ok_or_else(|| BlockchainError::PeerUnreachable(format!("{peer}: no such peer")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_keys_load() {
        assert!(matches!(rsa_private_key(), PrivateKeyMaterial::Rsa { .. }));
        let params = dsa_params();
        assert_eq!(params.subgroup_order.bits(), 224);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_dsa_fixture_public_key_matches() {
        use crate::utils::parse_decimal;

        let fixture: HashMap<String, String> = toml::from_str(DSA_KEY_TOML).unwrap();
        let expected = parse_decimal(&fixture["public_key"]).unwrap();
        let x = parse_decimal(&fixture["private_key"]).unwrap();
        assert_eq!(dsa_params().public_value(&x), expected);
    }

    #[test]
    fn test_mine_blocks_extends_chain() {
        let ledger = create_test_ledger("node-a");
        let blocks = mine_blocks(&ledger, 2);
        assert_eq!(blocks.len(), 2);
        assert_eq!(ledger.len().unwrap(), 3);
    }
}
