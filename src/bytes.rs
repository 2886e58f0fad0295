use crate::buffer::SecureBuffer;
use crate::crypto::fill_random;
use crate::encoding::TextEncoding;
use crate::error::{Result, SecretError};
use crate::string::SecretString;
use log::debug;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

const MIN_WRITE_CHUNK: usize = 16;
const MAX_WRITE_CHUNK: usize = 128;

/// Size of each write when a secret of `len` bytes goes to disk.
pub(crate) fn write_chunk_size(len: usize) -> usize {
    (len / 24).clamp(MIN_WRITE_CHUNK, MAX_WRITE_CHUNK)
}

/// An immutable secret byte sequence held in a [`SecureBuffer`].
///
/// The buffer is wiped when the secret is disposed or dropped. `SecretBytes`
/// deliberately implements neither `Clone` nor `Display`, and its `Debug`
/// output never shows the content.
///
/// # Example
///
/// ```rust
/// use securesecrets::{SecretBytes, TextEncoding};
///
/// let secret = SecretBytes::from_bytes(b"hunter2").unwrap();
/// let text = secret.to_string_secret(TextEncoding::Utf8).unwrap();
/// assert!(text.eq_str("hunter2").unwrap());
/// ```
pub struct SecretBytes {
    buffer: SecureBuffer<u8>,
}

impl SecretBytes {
    /// Copies `data` into a new secure buffer of exactly `data.len()` bytes.
    ///
    /// The source slice is neither owned nor wiped; see
    /// [`from_bytes_wiping`](Self::from_bytes_wiping) when it is sensitive too.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::from_buffer(SecureBuffer::from_slice(data)?))
    }

    /// Copies `data` into secure memory and then zeroes the source slice.
    pub fn from_bytes_wiping(data: &mut [u8]) -> Result<Self> {
        let secret = Self::from_bytes(data);
        data.zeroize();
        secret
    }

    /// Creates a secret of `len` cryptographically random bytes.
    pub fn random(len: usize) -> Result<Self> {
        Self::with_len(len, |bytes| {
            fill_random(bytes);
            Ok(bytes.len())
        })
    }

    /// Allocates `len` bytes and lets `fill` write the content.
    ///
    /// `fill` returns how many bytes it produced; the secret is narrowed to that
    /// count. If `fill` fails, the buffer is wiped before the error is returned.
    pub fn with_len<F>(len: usize, fill: F) -> Result<Self>
    where
        F: FnOnce(&mut [u8]) -> Result<usize>,
    {
        let mut buffer = SecureBuffer::new(len)?;
        let filled = buffer.as_mut_slice().and_then(fill);
        match filled.and_then(|written| buffer.set_logical_len(written)) {
            Ok(()) => Ok(Self::from_buffer(buffer)),
            Err(e) => {
                buffer.dispose();
                Err(e)
            }
        }
    }

    pub(crate) fn from_buffer(buffer: SecureBuffer<u8>) -> Self {
        Self { buffer }
    }

    pub(crate) fn into_buffer(self) -> SecureBuffer<u8> {
        self.buffer
    }

    /// Number of secret bytes. Zero once disposed.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Borrows the plaintext bytes.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        self.buffer.as_slice()
    }

    /// Compares the secret against `other` in constant time.
    pub fn ct_eq(&self, other: &[u8]) -> Result<bool> {
        let bytes = self.as_bytes()?;
        Ok(bytes.len() == other.len() && bool::from(bytes.ct_eq(other)))
    }

    /// Decodes the bytes into a new [`SecretString`].
    pub fn to_string_secret(&self, encoding: TextEncoding) -> Result<SecretString> {
        SecretString::decode(self, encoding)
    }

    /// Writes the raw bytes to `path`, creating or truncating the file.
    ///
    /// Bytes go to the file straight from secure memory in chunks of
    /// `len / 24` bytes, clamped to `16..=128`. There is intentionally no async
    /// variant.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.as_bytes()?;
        let mut file = File::create(path.as_ref())?;
        let chunk_size = write_chunk_size(bytes.len());
        for chunk in bytes.chunks(chunk_size) {
            file.write_all(chunk)?;
        }
        file.flush()?;
        debug!(
            "wrote {} secret bytes to {} in chunks of {}",
            bytes.len(),
            path.as_ref().display(),
            chunk_size
        );
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.buffer.is_released()
    }

    /// Wipes the secret. Idempotent.
    pub fn dispose(&mut self) {
        self.buffer.dispose();
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBytes")
            .field("len", &self.len())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl TryFrom<&[u8]> for SecretBytes {
    type Error = SecretError;

    fn try_from(data: &[u8]) -> Result<Self> {
        Self::from_bytes(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_chunk_size_is_clamped() {
        assert_eq!(write_chunk_size(0), 16);
        assert_eq!(write_chunk_size(24 * 20), 20);
        assert_eq!(write_chunk_size(24 * 128), 128);
        assert_eq!(write_chunk_size(1 << 20), 128);
    }

    #[test]
    fn test_with_len_narrows_and_cleans_up() {
        let secret = SecretBytes::with_len(8, |out| {
            out[..3].copy_from_slice(b"abc");
            Ok(3)
        })
        .unwrap();
        assert_eq!(secret.as_bytes().unwrap(), b"abc");

        let failed = SecretBytes::with_len(8, |_| Err(SecretError::Format("bad".into())));
        assert!(matches!(failed, Err(SecretError::Format(_))));

        let overfilled = SecretBytes::with_len(2, |_| Ok(3));
        assert!(matches!(overfilled, Err(SecretError::Range(_))));
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretBytes::from_bytes(b"topsecret").unwrap();
        let printed = format!("{:?}", secret);
        assert!(!printed.contains("topsecret"));
        assert!(printed.contains("len: 9"));
    }
}
