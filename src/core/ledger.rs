// The ledger owns this node's chain and the pool of transactions waiting for the next block
// Chain and pool sit behind one RwLock so admission, sealing and replacement never interleave
// The proof search runs outside the lock so transactions keep flowing while a block is mined

use crate::config::{generate_node_id, Config};
use crate::core::consensus::check_chain;
use crate::core::{Block, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use log::{debug, info};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Amount credited to the miner of each block
pub const MINING_REWARD: u64 = 1;

struct LedgerState {
    chain: Vec<Block>,       // Never empty: genesis is created with the ledger
    pool: Vec<Transaction>,  // Admitted transactions waiting for the next block
}

#[derive(Clone)]
pub struct Ledger {
    node_id: String,
    proof_of_work: ProofOfWork,
    reward: u64,
    state: Arc<RwLock<LedgerState>>,
}

impl Ledger {
    // A fresh ledger holding only a synthesized genesis block
    pub fn new(node_id: &str, proof_of_work: ProofOfWork) -> Result<Ledger> {
        Self::with_reward(node_id, proof_of_work, MINING_REWARD)
    }

    pub fn with_reward(node_id: &str, proof_of_work: ProofOfWork, reward: u64) -> Result<Ledger> {
        let genesis = Block::generate_genesis_block()?;
        info!("Created ledger for node {node_id} with genesis block");
        Ok(Ledger {
            node_id: node_id.to_string(),
            proof_of_work,
            reward,
            state: Arc::new(RwLock::new(LedgerState {
                chain: vec![genesis],
                pool: Vec::new(),
            })),
        })
    }

    pub fn from_config(config: &Config) -> Result<Ledger> {
        let node_id = config.node.id.clone().unwrap_or_else(generate_node_id);
        Self::with_reward(&node_id, config.proof_of_work()?, config.mining.reward)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire ledger lock: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire ledger lock: {e}")))
    }

    pub fn get_node_id(&self) -> &str {
        self.node_id.as_str()
    }

    pub fn get_proof_of_work(&self) -> &ProofOfWork {
        &self.proof_of_work
    }

    // When a transaction comes in I check it first and only then touch the pool
    // The returned index is the block the transaction will land in
    pub fn new_transaction(&self, transaction: Transaction) -> Result<usize> {
        transaction.verify()?;

        let mut state = self.write()?;
        state.pool.push(transaction);
        let index = state.chain.len() + 1;
        debug!("Admitted transaction into pool for block {index}");
        Ok(index)
    }

    // This is the only way new blocks get produced locally
    pub fn mine(&self) -> Result<Block> {
        loop {
            let last_block = self.last_block()?;
            let last_hash = last_block.hash()?;

            // The search can take a while, so no lock is held here
            let proof = self.proof_of_work.find_proof(last_block.get_proof());

            if let Some(block) = self.seal(&last_hash, proof)? {
                info!(
                    "Mined block {} with {} transactions (proof {})",
                    block.get_index(),
                    block.get_transactions().len(),
                    block.get_proof()
                );
                return Ok(block);
            }
            info!("Chain tip moved during proof search, searching again");
        }
    }

    // Seal the pool into a block on top of `expected_tip_hash`
    // Returns None when the tip is no longer the block the proof was found for
    fn seal(&self, expected_tip_hash: &str, proof: u64) -> Result<Option<Block>> {
        let mut state = self.write()?;

        let tip = state
            .chain
            .last()
            .ok_or_else(|| BlockchainError::ChainInvalid("chain is empty".to_string()))?;
        if tip.hash()? != expected_tip_hash {
            return Ok(None);
        }

        let reward = Transaction::new_reward(&self.node_id, self.reward);
        state.pool.push(reward);

        let index = state.chain.len() + 1;
        let transactions = std::mem::take(&mut state.pool);
        let block = Block::new_block(index, transactions, proof, expected_tip_hash.to_string())?;
        state.chain.push(block.clone());
        Ok(Some(block))
    }

    pub fn last_block(&self) -> Result<Block> {
        self.read()?
            .chain
            .last()
            .cloned()
            .ok_or_else(|| BlockchainError::ChainInvalid("chain is empty".to_string()))
    }

    pub fn chain(&self) -> Result<Vec<Block>> {
        Ok(self.read()?.chain.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.chain.len())
    }

    pub fn pending_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.read()?.pool.clone())
    }

    /// Swap in `candidate` as the whole chain.
    ///
    /// The candidate must be valid and still strictly longer than the local
    /// chain at the moment of the swap; otherwise nothing changes and
    /// `false` is returned. Pending transactions stay in the pool.
    pub fn replace_chain(&self, candidate: Vec<Block>) -> Result<bool> {
        check_chain(&candidate, &self.proof_of_work)?;

        let mut state = self.write()?;
        if candidate.len() <= state.chain.len() {
            info!(
                "Keeping local chain: candidate length {} does not exceed {}",
                candidate.len(),
                state.chain.len()
            );
            return Ok(false);
        }

        info!(
            "Replacing local chain of length {} with chain of length {}",
            state.chain.len(),
            candidate.len()
        );
        state.chain = candidate;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consensus::validate_chain;
    use crate::core::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF, REWARD_SENDER};
    use crate::crypto::SigningMethod;
    use crate::testnet::{create_test_ledger, dsa_private_key, rsa_private_key};

    #[test]
    fn test_fresh_ledger_has_genesis_only() {
        let ledger = create_test_ledger("node-a");
        assert_eq!(ledger.len().unwrap(), 1);

        let genesis = ledger.last_block().unwrap();
        assert_eq!(genesis.get_index(), 1);
        assert_eq!(genesis.get_proof(), GENESIS_PROOF);
        assert_eq!(genesis.get_previous_hash(), GENESIS_PREVIOUS_HASH);
        assert!(genesis.get_transactions().is_empty());
    }

    #[test]
    fn test_mine_once() {
        let ledger = create_test_ledger("node-a");
        let genesis = ledger.last_block().unwrap();
        let block = ledger.mine().unwrap();

        assert_eq!(ledger.len().unwrap(), 2);
        assert_eq!(block.get_index(), 2);
        assert_eq!(block.get_previous_hash(), genesis.hash().unwrap());

        let transactions = block.get_transactions();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].get_sender(), REWARD_SENDER);
        assert_eq!(transactions[0].get_recipient(), "node-a");
        assert_eq!(transactions[0].get_amount(), 1);
        assert_eq!(transactions[0].get_method(), SigningMethod::None);

        assert!(validate_chain(
            &ledger.chain().unwrap(),
            ledger.get_proof_of_work()
        ));
    }

    #[test]
    fn test_new_transaction_returns_next_block_index() {
        let ledger = create_test_ledger("node-a");
        let tx = Transaction::new_signed("alice", "bob", 3, &rsa_private_key()).unwrap();
        assert_eq!(ledger.new_transaction(tx).unwrap(), 2);

        ledger.mine().unwrap();
        let tx = Transaction::new_signed("carol", "dave", 4, &dsa_private_key()).unwrap();
        assert_eq!(ledger.new_transaction(tx).unwrap(), 3);
    }

    #[test]
    fn test_rejected_transaction_leaves_pool_untouched() {
        let ledger = create_test_ledger("node-a");
        let result = ledger.new_transaction(Transaction::new_unsigned("mallory", "bob", 9));
        assert!(matches!(result, Err(BlockchainError::InvalidSignature(_))));
        assert!(ledger.pending_transactions().unwrap().is_empty());
    }

    #[test]
    fn test_mining_seals_and_clears_pool() {
        let ledger = create_test_ledger("node-a");
        let tx = Transaction::new_signed("alice", "bob", 3, &rsa_private_key()).unwrap();
        ledger.new_transaction(tx.clone()).unwrap();

        let block = ledger.mine().unwrap();
        assert_eq!(block.get_transactions().len(), 2);
        assert_eq!(block.get_transactions()[0], tx);
        assert!(block.get_transactions()[1].is_reward());
        assert!(ledger.pending_transactions().unwrap().is_empty());
    }

    #[test]
    fn test_seal_refuses_stale_tip() {
        let ledger = create_test_ledger("node-a");
        let sealed = ledger.seal("not-the-tip", 0).unwrap();
        assert!(sealed.is_none());
        assert_eq!(ledger.len().unwrap(), 1);
        assert!(ledger.pending_transactions().unwrap().is_empty());
    }

    #[test]
    fn test_replace_chain_requires_strictly_longer() {
        let ledger = create_test_ledger("node-a");
        ledger.mine().unwrap();

        let other = create_test_ledger("node-b");
        other.mine().unwrap();
        assert!(!ledger.replace_chain(other.chain().unwrap()).unwrap());

        other.mine().unwrap();
        assert!(ledger.replace_chain(other.chain().unwrap()).unwrap());
        assert_eq!(ledger.chain().unwrap(), other.chain().unwrap());
    }

    #[test]
    fn test_replace_chain_rejects_invalid_candidate() {
        let ledger = create_test_ledger("node-a");
        let other = create_test_ledger("node-b");
        other.mine().unwrap();
        other.mine().unwrap();

        let mut forged = other.chain().unwrap();
        forged.swap(1, 2);
        assert!(matches!(
            ledger.replace_chain(forged),
            Err(BlockchainError::ChainInvalid(_))
        ));
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let ledger = create_test_ledger("node-a");
        let handle = ledger.clone();
        handle.mine().unwrap();
        assert_eq!(ledger.len().unwrap(), 2);
    }
}
