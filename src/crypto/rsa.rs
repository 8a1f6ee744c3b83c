use super::{PrivateKeyMaterial, PublicKeyMaterial, Signature, SignatureScheme};
use crate::error::{BlockchainError, Result};
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, UnparsedPublicKey, RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_SHA256};

/// RSASSA-PKCS1-v1.5 over SHA-256
pub struct RsaScheme;

impl SignatureScheme for RsaScheme {
    fn sign(
        &self,
        key: &PrivateKeyMaterial,
        payload: &[u8],
    ) -> Result<(Signature, PublicKeyMaterial)> {
        let der = match key {
            PrivateKeyMaterial::Rsa { der } => der,
            _ => {
                return Err(BlockchainError::InvalidKey(
                    "RSA signing requires an RSA private key".to_string(),
                ))
            }
        };

        let key_pair = RsaKeyPair::from_der(der)
            .or_else(|_| RsaKeyPair::from_pkcs8(der))
            .map_err(|e| {
                BlockchainError::InvalidKey(format!("Failed to parse RSA private key: {e}"))
            })?;

        let rng = SystemRandom::new();
        let mut signature = vec![0u8; key_pair.public().modulus_len()];
        key_pair
            .sign(&RSA_PKCS1_SHA256, &rng, payload, &mut signature)
            .map_err(|e| BlockchainError::Crypto(format!("Failed to sign message: {e}")))?;

        let public_key = key_pair.public().as_ref().to_vec();
        Ok((
            Signature::from(signature),
            PublicKeyMaterial::Rsa { der: public_key },
        ))
    }

    fn verify(
        &self,
        key: &PublicKeyMaterial,
        payload: &[u8],
        signature: &Signature,
    ) -> Result<()> {
        let der = match key {
            PublicKeyMaterial::Rsa { der } => der,
            _ => {
                return Err(BlockchainError::InvalidKey(
                    "RSA verification requires an RSA public key".to_string(),
                ))
            }
        };

        check_public_key(der)?;

        let public_key = UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, der.as_slice());
        public_key
            .verify(payload, signature.as_bytes())
            .map_err(|_| BlockchainError::VerificationFailed)
    }
}

const MIN_MODULUS_BITS: usize = 2048;
const MAX_MODULUS_BITS: usize = 8192;

const DER_SEQUENCE: u8 = 0x30;
const DER_INTEGER: u8 = 0x02;

// Split one DER element off `input`, returning its contents and the rest
fn der_element(input: &[u8], tag: u8) -> Result<(&[u8], &[u8])> {
    let malformed = |what: &str| BlockchainError::InvalidKey(format!("RSA public key {what}"));

    let (&found, rest) = input.split_first().ok_or_else(|| malformed("is truncated"))?;
    if found != tag {
        return Err(malformed("has an unexpected DER tag"));
    }
    let (&first, mut rest) = rest.split_first().ok_or_else(|| malformed("is truncated"))?;

    let len = if first < 0x80 {
        usize::from(first)
    } else {
        // Long form, at most four length bytes
        let count = usize::from(first & 0x7f);
        if count == 0 || count > 4 || rest.len() < count {
            return Err(malformed("has a bad DER length"));
        }
        let (len_bytes, tail) = rest.split_at(count);
        rest = tail;
        len_bytes
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b))
    };

    if rest.len() < len {
        return Err(malformed("is truncated"));
    }
    Ok(rest.split_at(len))
}

/// Check that `der` is a PKCS#1 `RSAPublicKey` with a modulus ring accepts
///
/// Anything that fails here is a bad key rather than a bad signature.
fn check_public_key(der: &[u8]) -> Result<()> {
    let (body, trailing) = der_element(der, DER_SEQUENCE)?;
    if !trailing.is_empty() {
        return Err(BlockchainError::InvalidKey(
            "RSA public key has trailing bytes".to_string(),
        ));
    }
    let (modulus, rest) = der_element(body, DER_INTEGER)?;
    let (exponent, rest) = der_element(rest, DER_INTEGER)?;
    if !rest.is_empty() {
        return Err(BlockchainError::InvalidKey(
            "RSA public key has extra fields".to_string(),
        ));
    }
    for (name, value) in [("modulus", modulus), ("public exponent", exponent)] {
        if value.first().map_or(true, |&b| b & 0x80 != 0) {
            return Err(BlockchainError::InvalidKey(format!(
                "RSA {name} must be positive"
            )));
        }
    }

    let modulus = match modulus.iter().position(|&b| b != 0) {
        Some(start) => &modulus[start..],
        None => &[],
    };
    let bits = match modulus.first() {
        Some(&top) => (modulus.len() - 1) * 8 + (8 - top.leading_zeros() as usize),
        None => 0,
    };
    if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&bits) {
        return Err(BlockchainError::InvalidKey(format!(
            "RSA modulus is {bits} bits, expected {MIN_MODULUS_BITS} to {MAX_MODULUS_BITS}"
        )));
    }
    Ok(())
}
