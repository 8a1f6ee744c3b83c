use crate::error::{BlockchainError, Result};
use crate::utils::sha256_hex;
use log::info;

/// Default digest prefix a valid proof must produce
pub const DEFAULT_DIFFICULTY_TARGET: &str = "0000";

/// Proof-of-work puzzle: find `p'` such that `sha256("{p}{p'}")` starts
/// with the difficulty target, where `p` is the previous block's proof.
///
/// Each extra hex character in the target multiplies the expected search
/// cost by 16. The search itself is unbounded; it is the target that keeps
/// it practical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOfWork {
    target: String,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        ProofOfWork {
            target: DEFAULT_DIFFICULTY_TARGET.to_string(),
        }
    }
}

impl ProofOfWork {
    pub fn new(target: &str) -> Result<ProofOfWork> {
        if target.is_empty() || target.len() > 64 {
            return Err(BlockchainError::Config(format!(
                "Difficulty target must be 1 to 64 hex characters, got {}",
                target.len()
            )));
        }
        if !target
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(BlockchainError::Config(format!(
                "Difficulty target must be lowercase hex: {target}"
            )));
        }
        Ok(ProofOfWork {
            target: target.to_string(),
        })
    }

    pub fn get_target(&self) -> &str {
        self.target.as_str()
    }

    /// Search candidates from 0 upwards and return the first valid one
    pub fn find_proof(&self, last_proof: u64) -> u64 {
        info!(
            "Searching proof after {last_proof} (target prefix {})",
            self.target
        );
        let mut proof = 0;
        while !self.is_valid_proof(last_proof, proof) {
            proof += 1;
        }
        info!("Found proof {proof} after {last_proof}");
        proof
    }

    pub fn is_valid_proof(&self, last_proof: u64, proof: u64) -> bool {
        let guess = format!("{last_proof}{proof}");
        sha256_hex(guess.as_bytes()).starts_with(self.target.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_proof_is_valid_and_minimal() {
        let pow = ProofOfWork::new("00").unwrap();
        let proof = pow.find_proof(100);
        assert!(pow.is_valid_proof(100, proof));
        for candidate in 0..proof {
            assert!(!pow.is_valid_proof(100, candidate));
        }
    }

    #[test]
    fn test_validity_is_deterministic() {
        let pow = ProofOfWork::default();
        for candidate in 0..200 {
            assert_eq!(
                pow.is_valid_proof(100, candidate),
                pow.is_valid_proof(100, candidate)
            );
        }
    }

    #[test]
    fn test_proof_depends_on_previous_proof() {
        let pow = ProofOfWork::new("0").unwrap();
        let proof = pow.find_proof(100);
        let digest = sha256_hex(format!("100{proof}").as_bytes());
        assert!(digest.starts_with('0'));
    }

    #[test]
    fn test_harder_target_needs_at_least_as_much_search() {
        let easy = ProofOfWork::new("0").unwrap();
        let hard = ProofOfWork::new("00").unwrap();
        let hard_proof = hard.find_proof(7);
        // Any proof valid for "00" is also valid for "0"
        assert!(easy.is_valid_proof(7, hard_proof));
        assert!(easy.find_proof(7) <= hard_proof);
    }

    #[test]
    fn test_target_validation() {
        assert!(ProofOfWork::new("").is_err());
        assert!(ProofOfWork::new("00G").is_err());
        assert!(ProofOfWork::new("AB").is_err());
        assert!(ProofOfWork::new(&"0".repeat(65)).is_err());
        assert_eq!(ProofOfWork::new("10").unwrap().get_target(), "10");
    }
}
