//! Transaction signing and verification
//!
//! A transaction names its signing method; each method maps to one
//! [`SignatureScheme`] implementation. The signed payload is always the
//! canonical text of `(sender, recipient, amount)`.

pub mod dsa;
pub mod rsa;

pub use dsa::{DsaParams, DsaScheme};
pub use rsa::RsaScheme;

use crate::error::{BlockchainError, Result};
use crate::utils::{decimal, decode_hex, hex_bytes, parse_decimal};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

/// How a transaction is authenticated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningMethod {
    /// Unsigned; only valid for the block reward
    #[default]
    None,
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "DSA")]
    Dsa,
}

impl SigningMethod {
    /// Resolve the scheme that implements this method
    pub fn scheme(self) -> Result<&'static dyn SignatureScheme> {
        match self {
            SigningMethod::Rsa => Ok(&RsaScheme),
            SigningMethod::Dsa => Ok(&DsaScheme),
            SigningMethod::None => Err(BlockchainError::InvalidMethod(self.to_string())),
        }
    }

    pub fn sign(
        self,
        key: &PrivateKeyMaterial,
        payload: &[u8],
    ) -> Result<(Signature, PublicKeyMaterial)> {
        self.scheme()?.sign(key, payload)
    }

    pub fn verify(
        self,
        key: &PublicKeyMaterial,
        payload: &[u8],
        signature: &Signature,
    ) -> Result<()> {
        self.scheme()?.verify(key, payload, signature)
    }
}

impl fmt::Display for SigningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningMethod::None => write!(f, "None"),
            SigningMethod::Rsa => write!(f, "RSA"),
            SigningMethod::Dsa => write!(f, "DSA"),
        }
    }
}

impl FromStr for SigningMethod {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RSA" => Ok(SigningMethod::Rsa),
            "DSA" => Ok(SigningMethod::Dsa),
            "NONE" => Ok(SigningMethod::None),
            _ => Err(BlockchainError::InvalidMethod(s.to_string())),
        }
    }
}

/// Capability set every signing method provides
pub trait SignatureScheme: Send + Sync {
    /// Sign `payload`, returning the signature and the matching public key
    fn sign(
        &self,
        key: &PrivateKeyMaterial,
        payload: &[u8],
    ) -> Result<(Signature, PublicKeyMaterial)>;

    /// Check `signature` over `payload` against the supplied public key.
    ///
    /// Malformed keys fail with `InvalidKey`; a signature that simply does
    /// not match fails with `VerificationFailed`.
    fn verify(&self, key: &PublicKeyMaterial, payload: &[u8], signature: &Signature)
        -> Result<()>;
}

/// Opaque signature bytes, hex encoded on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(#[serde(with = "hex_bytes")] Vec<u8>);

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Signature {
    fn from(bytes: Vec<u8>) -> Self {
        Signature(bytes)
    }
}

/// Public half of a signer's key, carried inside each signed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum PublicKeyMaterial {
    /// DER-encoded PKCS#1 `RSAPublicKey`
    Rsa {
        #[serde(with = "hex_bytes")]
        der: Vec<u8>,
    },
    /// Public value `y = g^x mod p` with its domain parameters
    Dsa {
        #[serde(with = "decimal")]
        y: BigUint,
        params: DsaParams,
    },
}

/// Private signing key; RSA key bytes are wiped on drop
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum PrivateKeyMaterial {
    /// DER-encoded PKCS#1 `RSAPrivateKey` (PKCS#8 is accepted too)
    Rsa {
        #[serde(with = "hex_bytes")]
        der: Vec<u8>,
    },
    /// Private exponent `x` with its domain parameters
    Dsa {
        #[serde(with = "decimal")]
        x: BigUint,
        params: DsaParams,
    },
}

// DSA key file layout: decimal strings for the group and the private exponent
#[derive(Deserialize)]
struct DsaKeyFile {
    generator: String,
    modulus: String,
    subgroup_order: String,
    private_key: String,
}

impl PrivateKeyMaterial {
    pub fn method(&self) -> SigningMethod {
        match self {
            PrivateKeyMaterial::Rsa { .. } => SigningMethod::Rsa,
            PrivateKeyMaterial::Dsa { .. } => SigningMethod::Dsa,
        }
    }

    /// Parse the contents of a key file.
    ///
    /// RSA keys are hex-encoded DER. DSA keys are TOML with `generator`,
    /// `modulus`, `subgroup_order` and `private_key` as decimal strings.
    pub fn from_key_text(method: SigningMethod, text: &str) -> Result<PrivateKeyMaterial> {
        match method {
            SigningMethod::Rsa => {
                let der = decode_hex(text.trim())
                    .map_err(|e| BlockchainError::InvalidKey(format!("RSA key file: {e}")))?;
                Ok(PrivateKeyMaterial::Rsa { der })
            }
            SigningMethod::Dsa => {
                let file: DsaKeyFile = toml::from_str(text)
                    .map_err(|e| BlockchainError::InvalidKey(format!("DSA key file: {e}")))?;
                let params = DsaParams::new(
                    parse_decimal(&file.generator)?,
                    parse_decimal(&file.modulus)?,
                    parse_decimal(&file.subgroup_order)?,
                );
                params.validate()?;
                Ok(PrivateKeyMaterial::Dsa {
                    x: parse_decimal(&file.private_key)?,
                    params,
                })
            }
            SigningMethod::None => Err(BlockchainError::InvalidMethod(method.to_string())),
        }
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivateKeyMaterial::Rsa { .. } => write!(f, "PrivateKeyMaterial::Rsa(..)"),
            PrivateKeyMaterial::Dsa { .. } => write!(f, "PrivateKeyMaterial::Dsa(..)"),
        }
    }
}

// BigUint has no Zeroize impl. Assigning zero digits of the same width
// writes over the existing buffer before it is freed.
fn wipe_biguint(value: &mut BigUint) {
    let digits = usize::try_from(value.bits().div_ceil(32)).unwrap_or(0);
    value.assign_from_slice(&vec![0u32; digits]);
}

impl Drop for PrivateKeyMaterial {
    fn drop(&mut self) {
        match self {
            PrivateKeyMaterial::Rsa { der } => der.zeroize(),
            PrivateKeyMaterial::Dsa { x, .. } => wipe_biguint(x),
        }
    }
}
