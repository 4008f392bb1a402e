//! Serialized secret blobs.
//!
//! # Format
//! - Bytes `0..16`: key derivation salt
//! - Bytes `16..`: ciphertext (encrypted data followed by a 16-byte tag)
//!
//! The split point is implied by the salt length; nothing else is stored.
//! In particular neither the nonce nor the KDF parameters are part of the
//! blob, so both must be fixed by convention.

use saltseal_common::{Error, Result};
use crate::aead::TAG_LENGTH;
use crate::keys::{Salt, SALT_LENGTH};

/// Smallest decodable blob: a salt plus an empty message's tag.
pub const MIN_BLOB_LENGTH: usize = SALT_LENGTH + TAG_LENGTH;

/// Concatenate a salt and a ciphertext into a blob.
pub fn encode(salt: &Salt, ciphertext: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(SALT_LENGTH + ciphertext.len());
    blob.extend_from_slice(salt.as_bytes());
    blob.extend_from_slice(ciphertext);
    blob
}

/// Split a blob into its salt and ciphertext.
///
/// # Errors
/// - `Format` if the blob is shorter than MIN_BLOB_LENGTH
pub fn decode(blob: &[u8]) -> Result<(Salt, Vec<u8>)> {
    let SecretBlob { salt, ciphertext } = SecretBlob::decode(blob)?;
    Ok((salt, ciphertext))
}

/// Owned form of a decoded blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretBlob {
    /// Salt the key was derived with.
    pub salt: Salt,
    /// Encrypted data followed by the tag.
    pub ciphertext: Vec<u8>,
}

impl SecretBlob {
    /// Pair a salt with its ciphertext.
    pub fn new(salt: Salt, ciphertext: Vec<u8>) -> Self {
        Self { salt, ciphertext }
    }

    /// Serialize to `salt || ciphertext`.
    pub fn encode(&self) -> Vec<u8> {
        encode(&self.salt, &self.ciphertext)
    }

    /// Parse a serialized blob.
    ///
    /// # Errors
    /// - `Format` if the blob is shorter than MIN_BLOB_LENGTH
    pub fn decode(blob: &[u8]) -> Result<Self> {
        if blob.len() < SALT_LENGTH {
            return Err(Error::Format(format!(
                "blob is {} bytes, too short to hold a {}-byte salt",
                blob.len(),
                SALT_LENGTH
            )));
        }
        if blob.len() < MIN_BLOB_LENGTH {
            return Err(Error::Format(format!(
                "blob is {} bytes, ciphertext is shorter than the {}-byte tag",
                blob.len(),
                TAG_LENGTH
            )));
        }

        let (salt, ciphertext) = blob.split_at(SALT_LENGTH);
        Ok(Self {
            salt: Salt::try_from_slice(salt)?,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Length of the plaintext this blob decrypts to.
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(TAG_LENGTH)
    }
}

impl TryFrom<&[u8]> for SecretBlob {
    type Error = Error;

    fn try_from(blob: &[u8]) -> Result<Self> {
        Self::decode(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let salt = Salt::from_bytes([0xAA; SALT_LENGTH]);
        let ciphertext = vec![0x55; 20];

        let blob = encode(&salt, &ciphertext);

        assert_eq!(blob.len(), SALT_LENGTH + ciphertext.len());
        assert_eq!(&blob[..SALT_LENGTH], salt.as_bytes());
        assert_eq!(&blob[SALT_LENGTH..], &ciphertext[..]);
    }

    #[test]
    fn test_decode_minimum_blob() {
        let blob = [3u8; MIN_BLOB_LENGTH];
        let (salt, ciphertext) = decode(&blob).unwrap();

        assert_eq!(salt.as_bytes(), &[3u8; SALT_LENGTH]);
        assert_eq!(ciphertext.len(), TAG_LENGTH);
    }

    #[test]
    fn test_decode_rejects_short_blobs() {
        for len in 0..MIN_BLOB_LENGTH {
            let blob = vec![0u8; len];
            assert!(matches!(decode(&blob), Err(Error::Format(_))), "len {}", len);
        }
    }

    #[test]
    fn test_try_from_and_plaintext_len() {
        let blob = vec![1u8; SALT_LENGTH + TAG_LENGTH + 28];
        let parsed = SecretBlob::try_from(&blob[..]).unwrap();

        assert_eq!(parsed.plaintext_len(), 28);
        assert_eq!(parsed.encode(), blob);
    }

    proptest! {
        #[test]
        fn prop_codec_roundtrip(
            salt in any::<[u8; SALT_LENGTH]>(),
            ciphertext in proptest::collection::vec(any::<u8>(), TAG_LENGTH..256),
        ) {
            let salt = Salt::from_bytes(salt);
            let blob = encode(&salt, &ciphertext);

            let (decoded_salt, decoded_ct) = decode(&blob).unwrap();
            prop_assert_eq!(decoded_salt, salt);
            prop_assert_eq!(decoded_ct, ciphertext);
        }
    }
}
