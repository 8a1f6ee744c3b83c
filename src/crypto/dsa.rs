use super::{PrivateKeyMaterial, PublicKeyMaterial, Signature, SignatureScheme};
use crate::error::{BlockchainError, Result};
use crate::utils::{decimal, sha256_digest};
use num_bigint::{BigUint, RandBigInt};
use serde::{Deserialize, Serialize};

/// DSA domain parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsaParams {
    /// Subgroup generator g
    #[serde(with = "decimal")]
    pub generator: BigUint,
    /// Prime modulus p
    #[serde(with = "decimal")]
    pub modulus: BigUint,
    /// Prime subgroup order q, dividing p - 1
    #[serde(with = "decimal")]
    pub subgroup_order: BigUint,
}

impl DsaParams {
    pub fn new(generator: BigUint, modulus: BigUint, subgroup_order: BigUint) -> DsaParams {
        DsaParams {
            generator,
            modulus,
            subgroup_order,
        }
    }

    /// Check that g generates a subgroup of order q in Z_p
    pub fn validate(&self) -> Result<()> {
        let one = BigUint::from(1u32);
        let (g, p, q) = (&self.generator, &self.modulus, &self.subgroup_order);

        if q.bits() < 2 || p <= q || g <= &one || g >= p {
            return Err(BlockchainError::InvalidKey(
                "DSA domain parameters are out of range".to_string(),
            ));
        }
        if (p - 1u32) % q != BigUint::from(0u32) {
            return Err(BlockchainError::InvalidKey(
                "DSA subgroup order does not divide p - 1".to_string(),
            ));
        }
        if g.modpow(q, p) != one {
            return Err(BlockchainError::InvalidKey(
                "DSA generator does not have order q".to_string(),
            ));
        }
        Ok(())
    }

    /// Public value y = g^x mod p
    pub fn public_value(&self, x: &BigUint) -> BigUint {
        self.generator.modpow(x, &self.modulus)
    }

    /// Byte width of each signature half
    fn scalar_len(&self) -> usize {
        ((self.subgroup_order.bits() + 7) / 8) as usize
    }

    /// SHA-256 of the payload, keeping the leftmost `bits(q)` bits
    fn message_scalar(&self, payload: &[u8]) -> BigUint {
        let digest = BigUint::from_bytes_be(sha256_digest(payload).as_slice());
        let q_bits = self.subgroup_order.bits();
        if q_bits < 256 {
            digest >> ((256 - q_bits) as usize)
        } else {
            digest
        }
    }

    /// Inverse modulo the prime q
    fn invert(&self, value: &BigUint) -> BigUint {
        let q = &self.subgroup_order;
        value.modpow(&(q - 2u32), q)
    }
}

/// Classic DSA with a fresh random nonce per signature.
///
/// Signatures are `r || s`, each big-endian and left-padded to the byte
/// length of q.
pub struct DsaScheme;

impl SignatureScheme for DsaScheme {
    fn sign(
        &self,
        key: &PrivateKeyMaterial,
        payload: &[u8],
    ) -> Result<(Signature, PublicKeyMaterial)> {
        let (x, params) = match key {
            PrivateKeyMaterial::Dsa { x, params } => (x, params),
            _ => {
                return Err(BlockchainError::InvalidKey(
                    "DSA signing requires a DSA private key".to_string(),
                ))
            }
        };
        params.validate()?;

        let zero = BigUint::from(0u32);
        let one = BigUint::from(1u32);
        let q = &params.subgroup_order;
        if x == &zero || x >= q {
            return Err(BlockchainError::InvalidKey(
                "DSA private key must lie in [1, q-1]".to_string(),
            ));
        }

        let z = params.message_scalar(payload);
        let mut rng = rand::thread_rng();
        let (r, s) = loop {
            let k = rng.gen_biguint_range(&one, q);
            let r = params.generator.modpow(&k, &params.modulus) % q;
            if r == zero {
                continue;
            }
            let s = (params.invert(&k) * (&z + x * &r)) % q;
            if s == zero {
                continue;
            }
            break (r, s);
        };

        let width = params.scalar_len();
        let mut signature = left_pad(&r, width);
        signature.extend(left_pad(&s, width));

        let public_key = PublicKeyMaterial::Dsa {
            y: params.public_value(x),
            params: params.clone(),
        };
        Ok((Signature::from(signature), public_key))
    }

    fn verify(
        &self,
        key: &PublicKeyMaterial,
        payload: &[u8],
        signature: &Signature,
    ) -> Result<()> {
        let (y, params) = match key {
            PublicKeyMaterial::Dsa { y, params } => (y, params),
            _ => {
                return Err(BlockchainError::InvalidKey(
                    "DSA verification requires a DSA public key".to_string(),
                ))
            }
        };
        params.validate()?;

        let zero = BigUint::from(0u32);
        let one = BigUint::from(1u32);
        let (p, q) = (&params.modulus, &params.subgroup_order);
        if y <= &one || y >= p {
            return Err(BlockchainError::InvalidKey(
                "DSA public value is out of range".to_string(),
            ));
        }

        let width = params.scalar_len();
        let bytes = signature.as_bytes();
        if bytes.len() != 2 * width {
            return Err(BlockchainError::VerificationFailed);
        }
        let r = BigUint::from_bytes_be(&bytes[..width]);
        let s = BigUint::from_bytes_be(&bytes[width..]);
        if r == zero || &r >= q || s == zero || &s >= q {
            return Err(BlockchainError::VerificationFailed);
        }

        let w = params.invert(&s);
        let u1 = (params.message_scalar(payload) * &w) % q;
        let u2 = (&r * &w) % q;
        let v = ((params.generator.modpow(&u1, p) * y.modpow(&u2, p)) % p) % q;

        if v == r {
            Ok(())
        } else {
            Err(BlockchainError::VerificationFailed)
        }
    }
}

fn left_pad(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut padded = vec![0u8; width.saturating_sub(bytes.len())];
    padded.extend(bytes);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{dsa_params, dsa_private_key};

    // Toy group: p = 23, q = 11, g = 4
    fn toy_params() -> DsaParams {
        DsaParams::new(
            BigUint::from(4u32),
            BigUint::from(23u32),
            BigUint::from(11u32),
        )
    }

    #[test]
    fn test_fixture_params_are_valid() {
        assert!(dsa_params().validate().is_ok());
        assert!(toy_params().validate().is_ok());
    }

    #[test]
    fn test_params_validation_rejects_bad_generator() {
        let mut params = toy_params();
        params.generator = BigUint::from(5u32); // order 22, not 11
        assert!(matches!(
            params.validate(),
            Err(BlockchainError::InvalidKey(_))
        ));

        params.generator = BigUint::from(1u32);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_dsa_sign_and_verify() {
        let key = dsa_private_key();
        let (signature, public_key) = DsaScheme.sign(&key, b"hello").unwrap();
        assert_eq!(signature.as_bytes().len(), 2 * dsa_params().scalar_len());
        assert!(DsaScheme.verify(&public_key, b"hello", &signature).is_ok());
    }

    #[test]
    fn test_dsa_nonce_is_fresh() {
        let key = dsa_private_key();
        let (first, _) = DsaScheme.sign(&key, b"hello").unwrap();
        let (second, _) = DsaScheme.sign(&key, b"hello").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_dsa_rejects_altered_payload() {
        let key = dsa_private_key();
        let (signature, public_key) = DsaScheme.sign(&key, b"amount=5").unwrap();
        let result = DsaScheme.verify(&public_key, b"amount=6", &signature);
        assert_eq!(result, Err(BlockchainError::VerificationFailed));
    }

    #[test]
    fn test_dsa_rejects_flipped_bit_and_bad_length() {
        let key = dsa_private_key();
        let (signature, public_key) = DsaScheme.sign(&key, b"hello").unwrap();

        let mut bytes = signature.clone().into_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let result = DsaScheme.verify(&public_key, b"hello", &Signature::from(bytes));
        assert_eq!(result, Err(BlockchainError::VerificationFailed));

        let mut short = signature.into_bytes();
        short.pop();
        let result = DsaScheme.verify(&public_key, b"hello", &Signature::from(short));
        assert_eq!(result, Err(BlockchainError::VerificationFailed));
    }

    #[test]
    fn test_dsa_public_value_must_be_in_range() {
        let (signature, _) = DsaScheme.sign(&dsa_private_key(), b"hello").unwrap();
        let public_key = PublicKeyMaterial::Dsa {
            y: BigUint::from(1u32),
            params: dsa_params(),
        };
        let result = DsaScheme.verify(&public_key, b"hello", &signature);
        assert!(matches!(result, Err(BlockchainError::InvalidKey(_))));
    }

    #[test]
    fn test_dsa_toy_group_round_trip() {
        let params = toy_params();
        let key = PrivateKeyMaterial::Dsa {
            x: BigUint::from(7u32),
            params: params.clone(),
        };
        let (signature, public_key) = DsaScheme.sign(&key, b"toy").unwrap();
        assert_eq!(signature.as_bytes().len(), 2);
        assert_eq!(
            public_key,
            PublicKeyMaterial::Dsa {
                y: params.public_value(&BigUint::from(7u32)),
                params,
            }
        );
        assert!(DsaScheme.verify(&public_key, b"toy", &signature).is_ok());
    }

    #[test]
    fn test_private_exponent_out_of_range() {
        let key = PrivateKeyMaterial::Dsa {
            x: BigUint::from(11u32),
            params: toy_params(),
        };
        assert!(matches!(
            DsaScheme.sign(&key, b"toy"),
            Err(BlockchainError::InvalidKey(_))
        ));
    }
}
