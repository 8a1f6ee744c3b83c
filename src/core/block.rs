use crate::core::Transaction;
use crate::error::Result;
use crate::utils::{canonical_json, current_timestamp, sha256_hex};
use serde::{Deserialize, Serialize};

/// Proof carried by every genesis block
pub const GENESIS_PROOF: u64 = 100;
/// `previous_hash` of every genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: usize,
    timestamp: i64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
}

impl Block {
    /// Seal a block; the transactions are frozen from here on
    pub fn new_block(
        index: usize,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: String,
    ) -> Result<Block> {
        Ok(Block {
            index,
            timestamp: current_timestamp()?,
            transactions,
            proof,
            previous_hash,
        })
    }

    pub fn generate_genesis_block() -> Result<Block> {
        Block::new_block(
            1,
            Vec::new(),
            GENESIS_PROOF,
            GENESIS_PREVIOUS_HASH.to_string(),
        )
    }

    /// SHA-256 over the canonical JSON encoding of the whole block
    pub fn hash(&self) -> Result<String> {
        let encoded = canonical_json(self)?;
        Ok(sha256_hex(encoded.as_bytes()))
    }

    pub fn get_index(&self) -> usize {
        self.index
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_proof(&self) -> u64 {
        self.proof
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 1 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// Create a block with a fixed timestamp (for testing only)
    #[cfg(test)]
    pub fn new_test_block(
        index: usize,
        timestamp: i64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: &str,
    ) -> Block {
        Block {
            index,
            timestamp,
            transactions,
            proof,
            previous_hash: previous_hash.to_string(),
        }
    }
}
