//! Utility functions and helpers
//!
//! This module contains hashing helpers, the canonical JSON encoder
//! and the serde adapters used for key material on the wire.

pub mod crypto;
pub mod serialization;

pub use crypto::{current_timestamp, sha256_digest, sha256_hex};

pub use serialization::{canonical_json, decimal, decode_hex, hex_bytes, parse_decimal};
