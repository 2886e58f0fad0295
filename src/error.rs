use std::io;
use thiserror::Error;

/// Errors that can occur while handling secret material.
///
/// The variants separate three kinds of caller mistakes: using a resource that
/// was already released, handing in malformed input, and cryptographic material
/// that does not match. The last one can also mean a [`SecureSecret`] was
/// carried across scope boundaries.
///
/// [`SecureSecret`]: crate::SecureSecret
#[derive(Error, Debug)]
pub enum SecretError {
    /// The buffer, scope or stream has already been released.
    ///
    /// The payload names the kind of resource.
    #[error("{0} has already been released")]
    Released(&'static str),

    /// The input could not be decoded: invalid Base64, invalid UTF-8, an
    /// odd-length UTF-16 payload, or a ciphertext of the wrong length.
    #[error("Invalid format: {0}")]
    Format(String),

    /// A length, capacity or position lies outside the permitted range.
    #[error("Out of range: {0}")]
    Range(String),

    /// The ciphertext did not authenticate under the scope's key.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// A write was attempted on a read-only stream.
    #[error("Stream is read-only")]
    ReadOnly,

    /// Secure memory could not be mapped or locked.
    #[error("Failed to allocate secure memory: {0}")]
    Allocation(String),

    /// Writing a secret to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<memcall::MemcallError> for SecretError {
    fn from(err: memcall::MemcallError) -> Self {
        SecretError::Allocation(err.to_string())
    }
}

impl From<SecretError> for io::Error {
    fn from(err: SecretError) -> Self {
        let kind = match &err {
            SecretError::Io(e) => e.kind(),
            SecretError::Released(_) => io::ErrorKind::Other,
            SecretError::Format(_) | SecretError::Crypto(_) => io::ErrorKind::InvalidData,
            SecretError::Range(_) => io::ErrorKind::InvalidInput,
            SecretError::ReadOnly => io::ErrorKind::PermissionDenied,
            SecretError::Allocation(_) => io::ErrorKind::OutOfMemory,
        };
        match err {
            SecretError::Io(e) => e,
            other => io::Error::new(kind, other),
        }
    }
}

/// Result type for secret operations.
pub type Result<T> = std::result::Result<T, SecretError>;
