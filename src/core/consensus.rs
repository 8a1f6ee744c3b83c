use crate::core::{Block, Ledger, ProofOfWork, GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
use crate::error::{BlockchainError, Result};
use crate::network::PeerRegistry;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::thread;

/// A peer's answer to "send me your chain"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainSnapshot {
    pub fn new(chain: Vec<Block>) -> ChainSnapshot {
        let length = chain.len();
        ChainSnapshot { chain, length }
    }
}

/// Where peer chains come from.
///
/// Implementations own their timeouts; a fetch that cannot reach the peer
/// fails with `PeerUnreachable`, one that gets an unusable answer with
/// `PeerMalformedResponse`.
pub trait ChainSource: Send + Sync {
    fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot>;
}

/// Longest-valid-chain resolution against every registered peer
pub struct ConsensusResolver {
    source: Box<dyn ChainSource>,
}

impl ConsensusResolver {
    pub fn new(source: impl ChainSource + 'static) -> ConsensusResolver {
        ConsensusResolver {
            source: Box::new(source),
        }
    }

    /// Returns true when the local chain was replaced
    pub fn resolve(&self, ledger: &Ledger, peers: &PeerRegistry) -> Result<bool> {
        let addresses = peers.peers()?;
        if addresses.is_empty() {
            info!("No peers registered, keeping local chain");
            return Ok(false);
        }

        // One scoped thread per peer; results come back in peer order
        let fetched: Vec<(String, Result<ChainSnapshot>)> = thread::scope(|scope| {
            let handles: Vec<_> = addresses
                .iter()
                .map(|peer| scope.spawn(move || self.source.fetch_chain(peer)))
                .collect();

            addresses
                .iter()
                .cloned()
                .zip(handles)
                .map(|(peer, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(BlockchainError::PeerUnreachable(format!(
                            "fetch thread for {peer} panicked"
                        )))
                    });
                    (peer, result)
                })
                .collect()
        });

        let proof_of_work = ledger.get_proof_of_work();
        let mut max_length = ledger.len()?;
        let mut best: Option<Vec<Block>> = None;

        for (peer, result) in fetched {
            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Skipping peer {peer}: {e}");
                    continue;
                }
            };
            if snapshot.length != snapshot.chain.len() {
                warn!(
                    "Skipping peer {peer}: advertised length {} but sent {} blocks",
                    snapshot.length,
                    snapshot.chain.len()
                );
                continue;
            }
            if snapshot.length <= max_length {
                continue;
            }
            if let Err(e) = check_chain(&snapshot.chain, proof_of_work) {
                warn!("Skipping peer {peer}: {e}");
                continue;
            }

            info!("Peer {peer} offers a valid chain of length {}", snapshot.length);
            max_length = snapshot.length;
            best = Some(snapshot.chain);
        }

        match best {
            Some(chain) => ledger.replace_chain(chain),
            None => Ok(false),
        }
    }
}

/// Check a whole chain and report the first broken rule.
///
/// The first block must be a genesis block: index 1, the genesis proof and
/// previous hash, and no transactions. Every later block must sit at its
/// position, link to the hash of the block before it, carry a proof valid
/// against the previous proof, and hold only admissible transactions.
pub fn check_chain(chain: &[Block], proof_of_work: &ProofOfWork) -> Result<()> {
    let genesis = chain
        .first()
        .ok_or_else(|| BlockchainError::ChainInvalid("chain is empty".to_string()))?;
    if genesis.get_index() != 1 {
        return Err(BlockchainError::ChainInvalid(format!(
            "first block has index {}",
            genesis.get_index()
        )));
    }
    if genesis.get_proof() != GENESIS_PROOF
        || genesis.get_previous_hash() != GENESIS_PREVIOUS_HASH
    {
        return Err(BlockchainError::ChainInvalid(
            "first block is not a genesis block".to_string(),
        ));
    }
    if !genesis.get_transactions().is_empty() {
        return Err(BlockchainError::ChainInvalid(
            "genesis block holds transactions".to_string(),
        ));
    }

    for (position, pair) in chain.windows(2).enumerate() {
        let (prior, block) = (&pair[0], &pair[1]);
        let expected_index = position + 2;

        if block.get_index() != expected_index {
            return Err(BlockchainError::ChainInvalid(format!(
                "block at position {expected_index} has index {}",
                block.get_index()
            )));
        }
        if block.get_previous_hash() != prior.hash()? {
            return Err(BlockchainError::ChainInvalid(format!(
                "block {expected_index} does not link to its predecessor"
            )));
        }
        if !proof_of_work.is_valid_proof(prior.get_proof(), block.get_proof()) {
            return Err(BlockchainError::ChainInvalid(format!(
                "block {expected_index} carries an invalid proof"
            )));
        }
        for transaction in block.get_transactions() {
            transaction.verify().map_err(|e| {
                BlockchainError::ChainInvalid(format!(
                    "block {expected_index} holds an inadmissible transaction: {e}"
                ))
            })?;
        }
    }
    Ok(())
}

pub fn validate_chain(chain: &[Block], proof_of_work: &ProofOfWork) -> bool {
    check_chain(chain, proof_of_work).is_ok()
}
