// Canonical JSON encoding plus the serde adapters for binary and big-integer fields
use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER_PERMISSIVE;
use num_bigint::BigUint;
use serde::Serialize;
use serde_json::Value;

/// Encode data as JSON with every object's keys sorted, recursively.
///
/// The output depends only on the logical content, never on field
/// declaration order or map insertion order, so it is safe to hash.
pub fn canonical_json<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    let value = serde_json::to_value(data)
        .map_err(|e| BlockchainError::Serialization(format!("Canonical encoding failed: {e}")))?;
    let mut out = String::new();
    write_canonical(&value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

/// Decode a hex string (either case) into bytes
pub fn decode_hex(text: &str) -> Result<Vec<u8>> {
    HEXLOWER_PERMISSIVE
        .decode(text.trim().as_bytes())
        .map_err(|e| BlockchainError::InvalidInput(format!("Invalid hex encoding: {e}")))
}

/// Parse a non-negative decimal integer of arbitrary size
pub fn parse_decimal(text: &str) -> Result<BigUint> {
    let digits = text.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BlockchainError::InvalidInput(format!(
            "Invalid decimal integer: {text}"
        )));
    }
    BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| BlockchainError::InvalidInput(format!("Invalid decimal integer: {text}")))
}

/// Serde adapter: `Vec<u8>` as a lowercase hex string
pub mod hex_bytes {
    use data_encoding::HEXLOWER;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&HEXLOWER.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::decode_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: `BigUint` as a decimal string
pub mod decimal {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_decimal(&text).map_err(serde::de::Error::custom)
    }
}
