//! Sealing sessions.
//!
//! A session owns one key together with that key's nonce sequence, so the
//! nonce is advanced as part of every seal and can never be reused by
//! accident.

use tracing::debug;

use saltseal_common::Result;
use crate::aead::{open, seal};
use crate::keys::DerivedKey;
use crate::nonce::{Nonce, NonceSequencer};

/// Output of [`SealingSession::seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Nonce the message was sealed under.
    pub nonce: Nonce,
    /// Encrypted data followed by the tag.
    pub ciphertext: Vec<u8>,
}

/// One key's encryption stream.
///
/// Not meant to be shared: sealing takes `&mut self`.
#[derive(Debug)]
pub struct SealingSession {
    key: DerivedKey,
    nonces: NonceSequencer,
    sealed: u64,
}

impl SealingSession {
    /// Start a session whose first nonce is all zero.
    pub fn new(key: DerivedKey) -> Self {
        Self::with_sequencer(key, NonceSequencer::new())
    }

    /// Start a session from an existing nonce sequence.
    ///
    /// # Preconditions
    /// - No nonce from `nonces` onwards has been used with `key` before
    pub fn with_sequencer(key: DerivedKey, nonces: NonceSequencer) -> Self {
        Self {
            key,
            nonces,
            sealed: 0,
        }
    }

    /// Seal a message under the next unused nonce.
    ///
    /// # Errors
    /// - `NonceExhausted` if the nonce sequence has run out
    pub fn seal(&mut self, plaintext: &[u8]) -> Result<Sealed> {
        let nonce = self.nonces.current()?;
        let ciphertext = seal(self.key.as_bytes(), nonce.as_bytes(), plaintext)?;

        self.sealed += 1;
        // Exhaustion after the last nonce is not an error for this seal;
        // the next call fails in `current()`.
        if self.nonces.advance().is_err() {
            debug!(sealed = self.sealed, "nonce sequence ended after final seal");
        }

        debug!(sealed = self.sealed, len = plaintext.len(), "sealed message");
        Ok(Sealed { nonce, ciphertext })
    }

    /// Open a message sealed by this session's key.
    ///
    /// # Errors
    /// - `AuthenticationFailure` if the ciphertext does not verify
    pub fn open(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        open(self.key.as_bytes(), nonce.as_bytes(), ciphertext)
    }

    /// The nonce the next seal will use.
    pub fn next_nonce(&self) -> Result<Nonce> {
        self.nonces.current()
    }

    /// Number of messages sealed so far.
    pub fn sealed_count(&self) -> u64 {
        self.sealed
    }
}
