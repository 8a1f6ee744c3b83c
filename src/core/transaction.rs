// Transactions move an amount from a sender to a recipient
// Every transaction except the mining reward carries a signature over (sender, recipient, amount)
// together with the public key that produced it

use crate::crypto::{PrivateKeyMaterial, PublicKeyMaterial, Signature, SigningMethod};
use crate::error::{BlockchainError, Result};
use crate::utils::canonical_json;
use serde::{Deserialize, Serialize};

/// Sender of the unsigned block-reward transaction
pub const REWARD_SENDER: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    sender: String,
    recipient: String,
    amount: u64,
    #[serde(default)]
    method: SigningMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<Signature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    public_key: Option<PublicKeyMaterial>,
}

// The exact triple that gets signed; method and signature stay out of it
#[derive(Serialize)]
struct SigningPayload<'a> {
    sender: &'a str,
    recipient: &'a str,
    amount: u64,
}

impl Transaction {
    // The block reward: system-issued, never signed
    pub fn new_reward(recipient: &str, amount: u64) -> Transaction {
        Transaction::new_unsigned(REWARD_SENDER, recipient, amount)
    }

    pub fn new_unsigned(sender: &str, recipient: &str, amount: u64) -> Transaction {
        Transaction {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
            method: SigningMethod::None,
            signature: None,
            public_key: None,
        }
    }

    // Sign with the given key; the method follows from the kind of key
    pub fn new_signed(
        sender: &str,
        recipient: &str,
        amount: u64,
        key: &PrivateKeyMaterial,
    ) -> Result<Transaction> {
        let method = key.method();
        let payload = signing_payload(sender, recipient, amount)?;
        let (signature, public_key) = method.sign(key, &payload)?;
        Ok(Transaction::with_signature(
            sender, recipient, amount, method, signature, public_key,
        ))
    }

    // Rebuild a transaction that was signed elsewhere
    pub fn with_signature(
        sender: &str,
        recipient: &str,
        amount: u64,
        method: SigningMethod,
        signature: Signature,
        public_key: PublicKeyMaterial,
    ) -> Transaction {
        Transaction {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
            method,
            signature: Some(signature),
            public_key: Some(public_key),
        }
    }

    pub fn signing_payload(&self) -> Result<Vec<u8>> {
        signing_payload(&self.sender, &self.recipient, self.amount)
    }

    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER && self.method == SigningMethod::None
    }

    /// Admission check shared by the pool and by chain validation.
    ///
    /// Unsigned transactions pass only for the reward sender. Signed ones are
    /// checked against the public key they carry, never against the sender
    /// string.
    pub fn verify(&self) -> Result<()> {
        if self.method == SigningMethod::None {
            if self.sender != REWARD_SENDER {
                return Err(BlockchainError::InvalidSignature(format!(
                    "unsigned transaction from {} (only the reward sender may skip signing)",
                    self.sender
                )));
            }
            if self.signature.is_some() || self.public_key.is_some() {
                return Err(BlockchainError::InvalidInput(
                    "unsigned transaction carries signature material".to_string(),
                ));
            }
            return Ok(());
        }

        let signature = self.signature.as_ref().ok_or_else(|| {
            BlockchainError::InvalidInput("Missing values: signature".to_string())
        })?;
        let public_key = self.public_key.as_ref().ok_or_else(|| {
            BlockchainError::InvalidInput("Missing values: public key".to_string())
        })?;

        let payload = self.signing_payload()?;
        self.method
            .verify(public_key, &payload, signature)
            .map_err(|e| BlockchainError::InvalidSignature(e.to_string()))
    }

    pub fn get_sender(&self) -> &str {
        self.sender.as_str()
    }

    pub fn get_recipient(&self) -> &str {
        self.recipient.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_method(&self) -> SigningMethod {
        self.method
    }

    pub fn get_signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn get_public_key(&self) -> Option<&PublicKeyMaterial> {
        self.public_key.as_ref()
    }
}

fn signing_payload(sender: &str, recipient: &str, amount: u64) -> Result<Vec<u8>> {
    let payload = SigningPayload {
        sender,
        recipient,
        amount,
    };
    Ok(canonical_json(&payload)?.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{dsa_private_key, rsa_private_key};

    #[test]
    fn test_reward_transaction_is_admitted() {
        let tx = Transaction::new_reward("node-a", 1);
        assert!(tx.is_reward());
        assert!(tx.verify().is_ok());
    }

    #[test]
    fn test_unsigned_non_reward_is_rejected() {
        let tx = Transaction::new_unsigned("alice", "bob", 5);
        assert!(matches!(
            tx.verify(),
            Err(BlockchainError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_signing_payload_is_the_sorted_triple() {
        let tx = Transaction::new_unsigned("alice", "bob", 5);
        assert_eq!(
            String::from_utf8(tx.signing_payload().unwrap()).unwrap(),
            r#"{"amount":5,"recipient":"bob","sender":"alice"}"#
        );
    }

    #[test]
    fn test_signed_transactions_verify() {
        for key in [rsa_private_key(), dsa_private_key()] {
            let tx = Transaction::new_signed("alice", "bob", 5, &key).unwrap();
            assert_eq!(tx.get_method(), key.method());
            assert!(tx.verify().is_ok());
        }
    }

    #[test]
    fn test_altered_amount_fails_verification() {
        for key in [rsa_private_key(), dsa_private_key()] {
            let tx = Transaction::new_signed("alice", "bob", 5, &key).unwrap();
            let tampered = Transaction::with_signature(
                "alice",
                "bob",
                6,
                tx.get_method(),
                tx.get_signature().unwrap().clone(),
                tx.get_public_key().unwrap().clone(),
            );
            assert!(matches!(
                tampered.verify(),
                Err(BlockchainError::InvalidSignature(_))
            ));
        }
    }

    #[test]
    fn test_missing_signature_is_invalid_input() {
        let mut tx = Transaction::new_signed("alice", "bob", 5, &rsa_private_key()).unwrap();
        tx.signature = None;
        assert!(matches!(tx.verify(), Err(BlockchainError::InvalidInput(_))));
    }

    #[test]
    fn test_json_round_trip_keeps_signature() {
        let tx = Transaction::new_signed("alice", "bob", 5, &dsa_private_key()).unwrap();
        let json = serde_json::to_string(&tx).unwrap();
        let decoded: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.verify().is_ok());
    }
}
