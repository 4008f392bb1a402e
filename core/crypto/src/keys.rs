//! Key types with secure memory handling.
//!
//! Derived keys zeroize their memory on drop and compare in constant time.

use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::kdf::{EntropySource, OsEntropy};
use saltseal_common::{Error, Result};

/// Length of derived keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of key derivation salts in bytes.
pub const SALT_LENGTH: usize = 16;

/// Symmetric key derived from a password.
///
/// Owned exclusively by whoever called derivation; keep its lifetime short.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LENGTH],
}

impl DerivedKey {
    /// Create a derived key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Create a derived key from a slice, checking its length.
    ///
    /// # Errors
    /// - `InvalidKeyOrNonceLength` if `bytes` is not KEY_LENGTH long
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| Error::InvalidKeyOrNonceLength {
                    what: "key",
                    expected: KEY_LENGTH,
                    actual: bytes.len(),
                })?;
        Ok(Self { key })
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.key[..].ct_eq(&other.key[..]).into()
    }
}

impl Eq for DerivedKey {}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedKey([REDACTED])")
    }
}

/// Salt for key derivation.
///
/// Not secret, but must be unpredictable and fresh for every derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(pub [u8; SALT_LENGTH]);

impl Salt {
    /// Generate a random salt from the operating system's CSPRNG.
    ///
    /// # Errors
    /// - `EntropyUnavailable` if the OS cannot supply randomness
    pub fn generate() -> Result<Self> {
        Self::generate_from(&mut OsEntropy)
    }

    /// Generate a random salt from the given entropy source.
    pub fn generate_from<E: EntropySource + ?Sized>(source: &mut E) -> Result<Self> {
        let mut salt = [0u8; SALT_LENGTH];
        source.fill(&mut salt)?;
        Ok(Self(salt))
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; SALT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking its length.
    ///
    /// # Errors
    /// - `InvalidInput` if `bytes` is not SALT_LENGTH long
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let salt: [u8; SALT_LENGTH] = bytes.try_into().map_err(|_| {
            Error::InvalidInput(format!(
                "Salt must be {} bytes, got {}",
                SALT_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self(salt))
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_LENGTH] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exhausted;

    impl EntropySource for Exhausted {
        fn fill(&mut self, _buf: &mut [u8]) -> Result<()> {
            Err(Error::EntropyUnavailable("source drained".to_string()))
        }
    }

    #[test]
    fn test_salt_generate() {
        let salt1 = Salt::generate().unwrap();
        let salt2 = Salt::generate().unwrap();

        // Random salts should be different
        assert_ne!(salt1.as_bytes(), salt2.as_bytes());
    }

    #[test]
    fn test_salt_generate_propagates_entropy_failure() {
        let result = Salt::generate_from(&mut Exhausted);
        assert!(matches!(result, Err(Error::EntropyUnavailable(_))));
    }

    #[test]
    fn test_salt_from_slice_length() {
        assert!(Salt::try_from_slice(&[0u8; SALT_LENGTH]).is_ok());
        assert!(Salt::try_from_slice(&[0u8; SALT_LENGTH - 1]).is_err());
    }

    #[test]
    fn test_derived_key_from_slice_length() {
        assert!(DerivedKey::try_from_slice(&[7u8; KEY_LENGTH]).is_ok());

        let err = DerivedKey::try_from_slice(&[7u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidKeyOrNonceLength {
                what: "key",
                expected: KEY_LENGTH,
                actual: 31
            }
        ));
    }

    #[test]
    fn test_derived_key_equality() {
        let a = DerivedKey::from_bytes([1u8; KEY_LENGTH]);
        let b = DerivedKey::from_bytes([1u8; KEY_LENGTH]);
        let c = DerivedKey::from_bytes([2u8; KEY_LENGTH]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_derived_key_debug_redacted() {
        let key = DerivedKey::from_bytes([0xAB; KEY_LENGTH]);
        assert_eq!(format!("{:?}", key), "DerivedKey([REDACTED])");
    }
}
