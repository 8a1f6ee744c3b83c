//! Shared fixtures for unit tests
//!
//! Key material comes from `tests/fixtures`; ledgers run at an easy
//! difficulty so mining stays fast.

pub mod test_utils;

pub use test_utils::*;
