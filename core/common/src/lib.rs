//! Common utilities and types shared across the saltseal crates.
//!
//! This module provides the error taxonomy used by every layer and the
//! zeroizing password wrapper handed to key derivation.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::Password;
