//! Authenticated encryption using XSalsa20-Poly1305 (NaCl secretbox).
//!
//! The keystream is XORed over the plaintext and a Poly1305 tag over the
//! result is appended. NaCl itself puts the tag first; this crate does
//! not, so the detached tag is placed after the body by hand. Opening
//! verifies the tag before any plaintext is released.

use crypto_secretbox::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    XSalsa20Poly1305,
};

use saltseal_common::{Error, Result};
use crate::keys::KEY_LENGTH;
use crate::nonce::NONCE_LENGTH;

/// Authentication tag size (16 bytes).
pub const TAG_LENGTH: usize = 16;

fn check_lengths(key: &[u8], nonce: &[u8]) -> Result<()> {
    if key.len() != KEY_LENGTH {
        return Err(Error::InvalidKeyOrNonceLength {
            what: "key",
            expected: KEY_LENGTH,
            actual: key.len(),
        });
    }
    if nonce.len() != NONCE_LENGTH {
        return Err(Error::InvalidKeyOrNonceLength {
            what: "nonce",
            expected: NONCE_LENGTH,
            actual: nonce.len(),
        });
    }
    Ok(())
}

/// Encrypt and authenticate plaintext.
///
/// # Preconditions
/// - `key` must be exactly KEY_LENGTH bytes
/// - `nonce` must be exactly NONCE_LENGTH bytes and never reused with `key`
///
/// # Postconditions
/// - Returns encrypted_data || tag
/// - The output length is plaintext length + TAG_LENGTH
///
/// # Errors
/// - `InvalidKeyOrNonceLength` if key or nonce length is incorrect
///
/// # Security
/// - Caller is responsible for nonce uniqueness
pub fn seal(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    check_lengths(key, nonce)?;

    let cipher = XSalsa20Poly1305::new(GenericArray::from_slice(key));

    let mut sealed = Vec::with_capacity(plaintext.len() + TAG_LENGTH);
    sealed.extend_from_slice(plaintext);

    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), b"", &mut sealed)
        .map_err(|_| Error::InvalidInput("Plaintext too large to seal".to_string()))?;
    sealed.extend_from_slice(&tag);

    Ok(sealed)
}

/// Verify and decrypt ciphertext produced by [`seal`].
///
/// # Preconditions
/// - `key` and `nonce` must be the ones used to seal
///
/// # Postconditions
/// - Returns the original plaintext, or nothing at all
///
/// # Errors
/// - `InvalidKeyOrNonceLength` if key or nonce length is incorrect
/// - `AuthenticationFailure` for truncated input, tampering, a wrong key
///   or a wrong nonce, without saying which
///
/// # Security
/// - The tag comparison is constant-time in the backend
pub fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    check_lengths(key, nonce)?;

    if ciphertext.len() < TAG_LENGTH {
        return Err(Error::AuthenticationFailure);
    }

    let (body, tag) = ciphertext.split_at(ciphertext.len() - TAG_LENGTH);
    let cipher = XSalsa20Poly1305::new(GenericArray::from_slice(key));

    let mut plaintext = body.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            b"",
            &mut plaintext,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| Error::AuthenticationFailure)?;

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MESSAGE: &[u8] = b"Gophers of the world, unite!";

    #[test]
    fn test_seal_open_roundtrip() {
        let key = [42u8; KEY_LENGTH];
        let nonce = [0u8; NONCE_LENGTH];

        let ciphertext = seal(&key, &nonce, MESSAGE).unwrap();
        let decrypted = open(&key, &nonce, &ciphertext).unwrap();

        assert_eq!(decrypted, MESSAGE);
    }

    #[test]
    fn test_ciphertext_size() {
        let key = [42u8; KEY_LENGTH];
        let nonce = [0u8; NONCE_LENGTH];

        let ciphertext = seal(&key, &nonce, MESSAGE).unwrap();

        assert_eq!(MESSAGE.len(), 28);
        assert_eq!(ciphertext.len(), MESSAGE.len() + TAG_LENGTH);
    }

    #[test]
    fn test_seal_is_deterministic_for_same_nonce() {
        let key = [42u8; KEY_LENGTH];
        let nonce = [1u8; NONCE_LENGTH];

        let ct1 = seal(&key, &nonce, MESSAGE).unwrap();
        let ct2 = seal(&key, &nonce, MESSAGE).unwrap();
        assert_eq!(ct1, ct2);

        let other = seal(&key, &[2u8; NONCE_LENGTH], MESSAGE).unwrap();
        assert_ne!(ct1, other);
    }

    #[test]
    fn test_tag_is_appended() {
        let key = [42u8; KEY_LENGTH];
        let nonce = [0u8; NONCE_LENGTH];

        let short = seal(&key, &nonce, b"Gophers").unwrap();
        let long = seal(&key, &nonce, MESSAGE).unwrap();

        // Same keystream, so the encrypted prefix matches and the tag follows.
        assert_eq!(short[..7], long[..7]);
    }

    #[test]
    fn test_tag_occupies_last_bytes() {
        let key = [42u8; KEY_LENGTH];
        let nonce = [0u8; NONCE_LENGTH];

        let a = seal(&key, &nonce, b"AAAAAAAA").unwrap();
        let b = seal(&key, &nonce, b"AAAAAAAB").unwrap();
        assert_eq!(a.len(), 8 + TAG_LENGTH);

        let differing: Vec<usize> = (0..a.len()).filter(|&i| a[i] != b[i]).collect();

        // Only the last body byte and the trailing tag change.
        assert_eq!(differing[0], 7);
        assert!(differing[1..].iter().all(|&i| i >= 8));
        assert_ne!(a[8..], b[8..]);
    }

    #[test]
    fn test_body_is_plaintext_xor_keystream() {
        let key = [42u8; KEY_LENGTH];
        let nonce = [3u8; NONCE_LENGTH];

        let zeros = seal(&key, &nonce, &[0u8; 32]).unwrap();
        let ones = seal(&key, &nonce, &[0xFFu8; 32]).unwrap();

        // The body is the bare keystream for an all-zero message.
        for i in 0..32 {
            assert_eq!(zeros[i] ^ 0xFF, ones[i]);
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let nonce = [0u8; NONCE_LENGTH];
        let ciphertext = seal(&[1u8; KEY_LENGTH], &nonce, MESSAGE).unwrap();

        let result = open(&[2u8; KEY_LENGTH], &nonce, &ciphertext);
        assert!(matches!(result, Err(Error::AuthenticationFailure)));
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let key = [42u8; KEY_LENGTH];
        let ciphertext = seal(&key, &[0u8; NONCE_LENGTH], MESSAGE).unwrap();

        let result = open(&key, &[1u8; NONCE_LENGTH], &ciphertext);
        assert!(matches!(result, Err(Error::AuthenticationFailure)));
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let key = [42u8; KEY_LENGTH];
        let nonce = [0u8; NONCE_LENGTH];
        let ciphertext = seal(&key, &nonce, MESSAGE).unwrap();

        for len in [0, 1, TAG_LENGTH - 1, TAG_LENGTH, ciphertext.len() - 1] {
            let result = open(&key, &nonce, &ciphertext[..len]);
            assert!(matches!(result, Err(Error::AuthenticationFailure)), "len {}", len);
        }
    }

    #[test]
    fn test_invalid_key_length() {
        let result = seal(&[0u8; 16], &[0u8; NONCE_LENGTH], b"data");
        assert!(matches!(
            result,
            Err(Error::InvalidKeyOrNonceLength { what: "key", .. })
        ));
    }

    #[test]
    fn test_invalid_nonce_length() {
        let key = [0u8; KEY_LENGTH];
        assert!(matches!(
            seal(&key, &[0u8; 12], b"data"),
            Err(Error::InvalidKeyOrNonceLength { what: "nonce", .. })
        ));
        assert!(matches!(
            open(&key, &[0u8; 12], &[0u8; 32]),
            Err(Error::InvalidKeyOrNonceLength { what: "nonce", .. })
        ));
    }

    #[test]
    fn test_empty_plaintext() {
        let key = [42u8; KEY_LENGTH];
        let nonce = [0u8; NONCE_LENGTH];

        let ciphertext = seal(&key, &nonce, b"").unwrap();
        assert_eq!(ciphertext.len(), TAG_LENGTH);
        assert!(open(&key, &nonce, &ciphertext).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            key in any::<[u8; KEY_LENGTH]>(),
            nonce in any::<[u8; NONCE_LENGTH]>(),
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let ciphertext = seal(&key, &nonce, &plaintext).unwrap();
            prop_assert_eq!(ciphertext.len(), plaintext.len() + TAG_LENGTH);
            prop_assert_eq!(open(&key, &nonce, &ciphertext).unwrap(), plaintext);
        }

        #[test]
        fn prop_any_bit_flip_is_rejected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..128),
            bit in any::<proptest::sample::Index>(),
        ) {
            let key = [7u8; KEY_LENGTH];
            let nonce = [9u8; NONCE_LENGTH];
            let mut ciphertext = seal(&key, &nonce, &plaintext).unwrap();

            let bit = bit.index(ciphertext.len() * 8);
            ciphertext[bit / 8] ^= 1 << (bit % 8);

            prop_assert!(matches!(
                open(&key, &nonce, &ciphertext),
                Err(Error::AuthenticationFailure)
            ));
        }
    }
}
