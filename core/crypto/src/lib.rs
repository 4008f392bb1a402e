//! Password-based authenticated encryption for saltseal.
//!
//! This module provides:
//! - Key derivation using scrypt
//! - A monotonic 24-byte nonce sequence
//! - Authenticated encryption using XSalsa20-Poly1305
//! - The `salt || ciphertext` blob format
//!
//! # Security Guarantees
//! - Derived keys are zeroized on drop and compared in constant time
//! - No password, key or plaintext material is ever logged
//! - Failed authentication never releases plaintext and never says why

pub mod kdf;
pub mod aead;
pub mod blob;
pub mod keys;
pub mod nonce;
pub mod secret;
pub mod session;

pub use aead::{open, seal, TAG_LENGTH};
pub use blob::{decode, encode, SecretBlob, MIN_BLOB_LENGTH};
pub use kdf::{derive_bytes, derive_key, random, EntropySource, KdfParams, KeyDeriver, OsEntropy};
pub use keys::{DerivedKey, Salt, KEY_LENGTH, SALT_LENGTH};
pub use nonce::{Nonce, NonceSequencer, NONCE_LENGTH};
pub use secret::{
    open_with_deriver, open_with_password, seal_with_deriver, seal_with_password, Secret,
};
pub use session::{Sealed, SealingSession};
