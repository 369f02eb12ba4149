//! `testrig-core` — shared building blocks for the harness crates.
//!
//! This crate carries no IO: the common error model and small pure helpers.

pub mod error;
pub mod hash;

pub use error::{HarnessError, HarnessResult};
pub use hash::hash_code;
