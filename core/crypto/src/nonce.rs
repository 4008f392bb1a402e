//! Nonces and the monotonic nonce sequence.
//!
//! A nonce must never be used twice under the same key. Uniqueness comes
//! from counting, not from randomness, so a sequence may start at zero.

use tracing::warn;

use saltseal_common::{Error, Result};

/// Nonce size for XSalsa20-Poly1305 (24 bytes).
pub const NONCE_LENGTH: usize = 24;

/// A fixed-width nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce<const W: usize = NONCE_LENGTH>([u8; W]);

impl<const W: usize> Nonce<W> {
    /// The all-zero nonce.
    pub const fn zero() -> Self {
        Self([0u8; W])
    }

    /// Create from bytes.
    pub const fn from_bytes(bytes: [u8; W]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking its length.
    ///
    /// # Errors
    /// - `InvalidKeyOrNonceLength` if `bytes` is not `W` long
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let nonce: [u8; W] = bytes
            .try_into()
            .map_err(|_| Error::InvalidKeyOrNonceLength {
                what: "nonce",
                expected: W,
                actual: bytes.len(),
            })?;
        Ok(Self(nonce))
    }

    /// Get the nonce bytes.
    pub fn as_bytes(&self) -> &[u8; W] {
        &self.0
    }
}

/// Produces nonces as a big-endian counter.
///
/// The sequence belongs to exactly one key. After every seal under the
/// current nonce, [`advance`](Self::advance) must be called before the
/// next seal. Sharing a sequencer between threads requires external
/// synchronization.
#[derive(Debug, Clone)]
pub struct NonceSequencer<const W: usize = NONCE_LENGTH> {
    current: [u8; W],
    exhausted: bool,
}

impl NonceSequencer {
    /// Create a sequencer starting at the all-zero nonce.
    pub fn new() -> Self {
        Self::starting_at(Nonce::zero())
    }
}

impl Default for NonceSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize> NonceSequencer<W> {
    /// Create a sequencer whose first nonce is `start`.
    pub fn starting_at(start: Nonce<W>) -> Self {
        Self {
            current: start.0,
            exhausted: false,
        }
    }

    /// The nonce to use for the next seal. Does not advance.
    ///
    /// # Errors
    /// - `NonceExhausted` once the counter has wrapped
    pub fn current(&self) -> Result<Nonce<W>> {
        if self.exhausted {
            return Err(Error::NonceExhausted);
        }
        Ok(Nonce(self.current))
    }

    /// Increment the nonce by one as a big-endian counter.
    ///
    /// # Errors
    /// - `NonceExhausted` if every byte wrapped; the sequencer then refuses
    ///   to hand out any further nonce
    pub fn advance(&mut self) -> Result<()> {
        if self.exhausted {
            return Err(Error::NonceExhausted);
        }

        for byte in self.current.iter_mut().rev() {
            *byte = byte.wrapping_add(1);
            if *byte != 0 {
                return Ok(());
            }
        }

        self.exhausted = true;
        warn!(width = W, "nonce sequence exhausted");
        Err(Error::NonceExhausted)
    }

    /// Whether the counter has wrapped.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
