//! Key derivation using scrypt.
//!
//! scrypt is a memory-hard password hashing function: its cost parameters
//! make every password guess expensive in both CPU time and memory.
//!
//! Changing the parameters for existing blobs breaks re-derivation unless
//! the parameters are persisted next to the blob or fixed by convention.

use std::time::Instant;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::keys::{DerivedKey, Salt, KEY_LENGTH};
use saltseal_common::{Error, Result};

/// Smallest output length the scrypt backend accepts.
pub const MIN_OUTPUT_LENGTH: usize = 10;

/// Largest output length the scrypt backend accepts.
pub const MAX_OUTPUT_LENGTH: usize = 64;

/// Default cap on the memory a single derivation may use (2 GiB).
pub const DEFAULT_MEMORY_LIMIT: u64 = 2 * 1024 * 1024 * 1024;

/// Parameters for scrypt key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// CPU/memory cost `N`; must be a power of two greater than one.
    pub work_factor: u64,
    /// Block size `r`.
    pub block_size: u32,
    /// Parallelism `p`.
    pub parallelism: u32,
    /// Number of output bytes.
    pub output_length: usize,
}

impl KdfParams {
    /// Parameters suitable for interactive use (N = 2^14, r = 8, p = 1).
    ///
    /// Targets roughly 100ms per derivation on commodity hardware.
    pub fn interactive() -> Self {
        Self {
            work_factor: 16384,
            block_size: 8,
            parallelism: 1,
            output_length: KEY_LENGTH,
        }
    }

    /// Twice the interactive cost (N = 2^15).
    pub fn moderate() -> Self {
        Self {
            work_factor: 32768,
            ..Self::interactive()
        }
    }

    /// Parameters for sensitive data (N = 2^20, 1 GiB of memory).
    ///
    /// Takes several seconds per derivation.
    pub fn sensitive() -> Self {
        Self {
            work_factor: 1 << 20,
            ..Self::interactive()
        }
    }

    /// `log2(N)`, if `N` is a valid power of two.
    pub fn log_n(&self) -> Result<u8> {
        if self.work_factor < 2 || !self.work_factor.is_power_of_two() {
            return Err(Error::Derivation(format!(
                "work factor N must be a power of two greater than 1, got {}",
                self.work_factor
            )));
        }
        Ok(self.work_factor.trailing_zeros() as u8)
    }

    /// Check the parameters without running a derivation.
    ///
    /// # Errors
    /// - `Derivation` if any parameter is out of the supported range
    pub fn validate(&self) -> Result<()> {
        self.to_scrypt_params().map(|_| ())
    }

    /// Bytes of working memory a derivation with these parameters needs.
    ///
    /// Returns `None` if the figure does not fit in a `u64`.
    pub fn memory_required(&self) -> Option<u64> {
        let r = u64::from(self.block_size);
        let p = u64::from(self.parallelism);
        let block = r.checked_mul(128)?;

        let v = block.checked_mul(self.work_factor)?;
        let b = block.checked_mul(p)?;
        let xy = block.checked_mul(2)?;

        v.checked_add(b)?.checked_add(xy)
    }

    fn to_scrypt_params(&self) -> Result<scrypt::Params> {
        let log_n = self.log_n()?;

        if !(MIN_OUTPUT_LENGTH..=MAX_OUTPUT_LENGTH).contains(&self.output_length) {
            return Err(Error::Derivation(format!(
                "output length must be between {} and {} bytes, got {}",
                MIN_OUTPUT_LENGTH, MAX_OUTPUT_LENGTH, self.output_length
            )));
        }

        // scrypt requires N < 2^(16 * r)
        if u32::from(log_n) >= self.block_size.saturating_mul(16) {
            return Err(Error::Derivation(format!(
                "work factor N={} is too large for block size r={}",
                self.work_factor, self.block_size
            )));
        }

        scrypt::Params::new(log_n, self.block_size, self.parallelism, self.output_length)
            .map_err(|e| {
                Error::Derivation(format!(
                    "invalid scrypt parameters (N={}, r={}, p={}): {}",
                    self.work_factor, self.block_size, self.parallelism, e
                ))
            })
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Derives keys from passwords under fixed cost parameters and a memory cap.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    params: KdfParams,
    memory_limit: u64,
}

impl KeyDeriver {
    /// Create a deriver with the default memory limit.
    pub fn new(params: KdfParams) -> Self {
        Self {
            params,
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }

    /// Set a custom memory limit in bytes.
    pub fn with_memory_limit(mut self, limit: u64) -> Self {
        self.memory_limit = limit;
        self
    }

    /// The cost parameters used by this deriver.
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Derive a key from a password and salt.
    ///
    /// # Preconditions
    /// - `params.output_length` must be KEY_LENGTH
    ///
    /// # Postconditions
    /// - The derived key is deterministic given the same inputs
    ///
    /// # Errors
    /// - `Derivation` if the cost parameters are invalid
    /// - `ResourceExhausted` if the parameters exceed the memory limit
    pub fn derive(&self, password: &[u8], salt: &Salt) -> Result<DerivedKey> {
        if self.params.output_length != KEY_LENGTH {
            return Err(Error::Derivation(format!(
                "key derivation must produce {} bytes, params ask for {}",
                KEY_LENGTH, self.params.output_length
            )));
        }

        let mut key = [0u8; KEY_LENGTH];
        self.derive_into(password, salt.as_bytes(), &mut key)?;

        let derived = DerivedKey::from_bytes(key);
        zeroize::Zeroize::zeroize(&mut key);
        Ok(derived)
    }

    /// Derive `params.output_length` raw bytes.
    ///
    /// Unlike [`derive`](Self::derive) this accepts salts of any length and
    /// any supported output length.
    pub fn derive_bytes(&self, password: &[u8], salt: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let mut output = Zeroizing::new(vec![0u8; self.params.output_length]);
        self.derive_into(password, salt, &mut output)?;
        Ok(output)
    }

    fn derive_into(&self, password: &[u8], salt: &[u8], output: &mut [u8]) -> Result<()> {
        let scrypt_params = self.params.to_scrypt_params()?;

        let required = self.params.memory_required().ok_or(Error::ResourceExhausted {
            required: u64::MAX,
            limit: self.memory_limit,
        })?;
        if required > self.memory_limit {
            return Err(Error::ResourceExhausted {
                required,
                limit: self.memory_limit,
            });
        }

        let started = Instant::now();
        scrypt::scrypt(password, salt, &scrypt_params, output)
            .map_err(|e| Error::Derivation(format!("scrypt failed: {}", e)))?;

        debug!(
            n = self.params.work_factor,
            r = self.params.block_size,
            p = self.params.parallelism,
            memory = required,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "derived key"
        );
        Ok(())
    }
}

/// Derive a key from a password and salt using scrypt.
///
/// Convenience wrapper around [`KeyDeriver`] with the default memory limit.
pub fn derive_key(password: &[u8], salt: &Salt, params: &KdfParams) -> Result<DerivedKey> {
    KeyDeriver::new(*params).derive(password, salt)
}

/// Derive raw output bytes; see [`KeyDeriver::derive_bytes`].
pub fn derive_bytes(password: &[u8], salt: &[u8], params: &KdfParams) -> Result<Zeroizing<Vec<u8>>> {
    KeyDeriver::new(*params).derive_bytes(password, salt)
}

/// A cryptographically secure source of random bytes.
///
/// Implementations must fail rather than fall back to a weaker generator.
pub trait EntropySource {
    /// Fill `buf` entirely with random bytes.
    ///
    /// # Errors
    /// - `EntropyUnavailable` if the source cannot supply randomness
    fn fill(&mut self, buf: &mut [u8]) -> Result<()>;
}

/// Entropy from the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| Error::EntropyUnavailable(e.to_string()))
    }
}

/// Draw `n` bytes from the operating system's CSPRNG.
pub fn random(n: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; n];
    OsEntropy.fill(&mut bytes)?;
    Ok(bytes)
}
