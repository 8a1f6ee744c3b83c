use crate::core::{Block, Transaction};
use crate::crypto::{PrivateKeyMaterial, PublicKeyMaterial, Signature, SigningMethod};
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

/// Node protocol messages, one request and one response per connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Package {
    NewTransaction { transaction: TransactionRequest },
    TransactionAccepted { index: usize },
    Mine,
    Mined { block: Block },
    GetChain,
    Chain { chain: Vec<Block>, length: usize },
    RegisterNodes { nodes: Vec<String> },
    NodesRegistered { total_nodes: usize },
    Resolve,
    Resolved { replaced: bool, chain: Vec<Block> },
    Error { kind: String, message: String },
}

impl Package {
    pub fn name(&self) -> &'static str {
        match self {
            Package::NewTransaction { .. } => "NewTransaction",
            Package::TransactionAccepted { .. } => "TransactionAccepted",
            Package::Mine => "Mine",
            Package::Mined { .. } => "Mined",
            Package::GetChain => "GetChain",
            Package::Chain { .. } => "Chain",
            Package::RegisterNodes { .. } => "RegisterNodes",
            Package::NodesRegistered { .. } => "NodesRegistered",
            Package::Resolve => "Resolve",
            Package::Resolved { .. } => "Resolved",
            Package::Error { .. } => "Error",
        }
    }

    pub fn error(err: &BlockchainError) -> Package {
        Package::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// How a submitted transaction proves its origin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credential {
    /// Signed by the client
    Signature {
        signature: Signature,
        public_key: PublicKeyMaterial,
    },
    /// Signed by the receiving node with the given key
    SigningKey { key: PrivateKeyMaterial },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    #[serde(default)]
    pub method: SigningMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
}

impl TransactionRequest {
    /// Build the transaction this request describes, signing it if a key was supplied
    pub fn into_transaction(self) -> Result<Transaction> {
        match (self.method, self.credential) {
            (SigningMethod::None, None) => Ok(Transaction::new_unsigned(
                &self.sender,
                &self.recipient,
                self.amount,
            )),
            (SigningMethod::None, Some(_)) => Err(BlockchainError::InvalidInput(
                "unsigned transaction carries a credential".to_string(),
            )),
            (_, None) => Err(BlockchainError::InvalidInput(format!(
                "Missing values: {} transaction needs a signature or signing key",
                self.method
            ))),
            (
                method,
                Some(Credential::Signature {
                    signature,
                    public_key,
                }),
            ) => Ok(Transaction::with_signature(
                &self.sender,
                &self.recipient,
                self.amount,
                method,
                signature,
                public_key,
            )),
            (method, Some(Credential::SigningKey { key })) => {
                if key.method() != method {
                    return Err(BlockchainError::InvalidKey(format!(
                        "{method} transaction cannot be signed with a {} key",
                        key.method()
                    )));
                }
                Transaction::new_signed(&self.sender, &self.recipient, self.amount, &key)
            }
        }
    }
}

impl From<Transaction> for TransactionRequest {
    fn from(tx: Transaction) -> Self {
        let credential = match (tx.get_signature(), tx.get_public_key()) {
            (Some(signature), Some(public_key)) => Some(Credential::Signature {
                signature: signature.clone(),
                public_key: public_key.clone(),
            }),
            _ => None,
        };
        TransactionRequest {
            sender: tx.get_sender().to_string(),
            recipient: tx.get_recipient().to_string(),
            amount: tx.get_amount(),
            method: tx.get_method(),
            credential,
        }
    }
}
