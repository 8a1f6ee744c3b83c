//! Core ledger functionality
//!
//! This module contains blocks, signed transactions, the proof-of-work
//! puzzle, the ledger that owns the chain and the consensus resolver
//! that keeps it in line with the longest valid peer chain.

pub mod block;
pub mod consensus;
pub mod ledger;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
pub use consensus::{check_chain, validate_chain, ChainSnapshot, ChainSource, ConsensusResolver};
pub use ledger::{Ledger, MINING_REWARD};
pub use proof_of_work::{ProofOfWork, DEFAULT_DIFFICULTY_TARGET};
pub use transaction::{Transaction, REWARD_SENDER};
