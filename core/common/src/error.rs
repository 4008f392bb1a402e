//! Common error types for saltseal.

use thiserror::Error;

/// Top-level error type for saltseal operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The secure random source could not supply bytes.
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),

    /// Key derivation rejected its cost parameters.
    #[error("Key derivation error: {0}")]
    Derivation(String),

    /// Key derivation would need more memory than allowed.
    #[error("Key derivation needs {required} bytes of memory, limit is {limit}")]
    ResourceExhausted { required: u64, limit: u64 },

    /// A fixed-length key or nonce buffer had the wrong size.
    #[error("Invalid {what} length: expected {expected}, got {actual}")]
    InvalidKeyOrNonceLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Ciphertext failed to authenticate.
    ///
    /// Deliberately carries no detail: a wrong key and a tampered
    /// ciphertext must be indistinguishable.
    #[error("Authentication failed")]
    AuthenticationFailure,

    /// A serialized blob could not be decoded.
    #[error("Format error: {0}")]
    Format(String),

    /// The nonce sequence wrapped around.
    #[error("Nonce space exhausted")]
    NonceExhausted,

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from key derivation, either bad cost
    /// parameters or a memory budget overrun.
    pub fn is_derivation_error(&self) -> bool {
        matches!(self, Error::Derivation(_) | Error::ResourceExhausted { .. })
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_errors_are_grouped() {
        assert!(Error::Derivation("bad N".to_string()).is_derivation_error());
        assert!(Error::ResourceExhausted {
            required: 2,
            limit: 1
        }
        .is_derivation_error());
        assert!(!Error::AuthenticationFailure.is_derivation_error());
    }

    #[test]
    fn test_authentication_failure_is_generic() {
        assert_eq!(Error::AuthenticationFailure.to_string(), "Authentication failed");
    }
}
