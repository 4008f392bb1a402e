//! Password-derived secrets and one-shot sealing helpers.
//!
//! Each call to [`seal_with_password`] draws a fresh salt, so every blob is
//! sealed under its own key. The first nonce of a fresh key's sequence is
//! therefore safe to fix by convention, which is why blobs carry no nonce.

use saltseal_common::Result;
use crate::aead;
use crate::blob::SecretBlob;
use crate::kdf::{EntropySource, KdfParams, KeyDeriver, OsEntropy};
use crate::keys::{DerivedKey, Salt};
use crate::nonce::Nonce;
use crate::session::SealingSession;

/// A salt together with the key derived from it.
#[derive(Debug, Clone)]
pub struct Secret {
    salt: Salt,
    key: DerivedKey,
}

impl Secret {
    /// Derive a key from `password` under a freshly generated salt.
    ///
    /// # Errors
    /// - `EntropyUnavailable` if no salt can be generated
    /// - `Derivation` / `ResourceExhausted` from key derivation
    pub fn new(password: &[u8], params: &KdfParams) -> Result<Self> {
        Self::new_from(password, &KeyDeriver::new(*params), &mut OsEntropy)
    }

    /// Like [`new`](Self::new), with an explicit deriver and entropy source.
    pub fn new_from<E: EntropySource + ?Sized>(
        password: &[u8],
        deriver: &KeyDeriver,
        entropy: &mut E,
    ) -> Result<Self> {
        let salt = Salt::generate_from(entropy)?;
        let key = deriver.derive(password, &salt)?;
        Ok(Self { salt, key })
    }

    /// Re-derive the key for a known salt.
    pub fn recover(password: &[u8], salt: Salt, deriver: &KeyDeriver) -> Result<Self> {
        let key = deriver.derive(password, &salt)?;
        Ok(Self { salt, key })
    }

    /// The salt the key was derived with.
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    /// The derived key.
    pub fn key(&self) -> &DerivedKey {
        &self.key
    }

    /// Start a sealing session for this key at the zero nonce.
    pub fn into_session(self) -> SealingSession {
        SealingSession::new(self.key)
    }
}

/// Seal `plaintext` into a self-contained blob under `password`.
///
/// # Errors
/// - `EntropyUnavailable` if no salt can be generated
/// - `Derivation` / `ResourceExhausted` from key derivation
pub fn seal_with_password(password: &[u8], params: &KdfParams, plaintext: &[u8]) -> Result<Vec<u8>> {
    seal_with_deriver(password, &KeyDeriver::new(*params), plaintext)
}

/// [`seal_with_password`] with an explicit deriver.
pub fn seal_with_deriver(password: &[u8], deriver: &KeyDeriver, plaintext: &[u8]) -> Result<Vec<u8>> {
    let secret = Secret::new_from(password, deriver, &mut OsEntropy)?;
    let salt = *secret.salt();

    let sealed = secret.into_session().seal(plaintext)?;
    Ok(SecretBlob::new(salt, sealed.ciphertext).encode())
}

/// Open a blob produced by [`seal_with_password`].
///
/// # Errors
/// - `Format` if the blob is malformed
/// - `AuthenticationFailure` for a wrong password, wrong parameters or a
///   corrupted blob
pub fn open_with_password(password: &[u8], params: &KdfParams, blob: &[u8]) -> Result<Vec<u8>> {
    open_with_deriver(password, &KeyDeriver::new(*params), blob)
}

/// [`open_with_password`] with an explicit deriver.
pub fn open_with_deriver(password: &[u8], deriver: &KeyDeriver, blob: &[u8]) -> Result<Vec<u8>> {
    let blob = SecretBlob::decode(blob)?;
    let secret = Secret::recover(password, blob.salt, deriver)?;

    let nonce: Nonce = Nonce::zero();
    aead::open(secret.key().as_bytes(), nonce.as_bytes(), &blob.ciphertext)
}
