use crate::buffer::SecureBuffer;
use crate::bytes::SecretBytes;
use crate::encoding::TextEncoding;
use crate::error::{Result, SecretError};
use std::fmt;
use std::io::{self, Read};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Bytes pulled from a reader per step while decoding a stream.
const READ_CHUNK: usize = 64;

/// An immutable secret character sequence.
///
/// A `SecretString` only ever comes from decoding secret bytes under a
/// [`TextEncoding`]; there is no constructor taking a `&str`, because the
/// `&str` would already be plaintext in ordinary memory.
pub struct SecretString {
    buffer: SecureBuffer<char>,
}

impl SecretString {
    /// Decodes `bytes` under `encoding`.
    ///
    /// The destination is allocated at the largest character count the input
    /// could produce and narrowed to the actual count. On any decoding error
    /// the partially filled destination is wiped before the error is returned.
    pub fn decode(bytes: &SecretBytes, encoding: TextEncoding) -> Result<Self> {
        Self::decode_slice(bytes.as_bytes()?, encoding)
    }

    pub(crate) fn decode_slice(input: &[u8], encoding: TextEncoding) -> Result<Self> {
        let buffer = Self::allocate_for(input.len(), encoding)?;
        Self::decode_into(input, encoding, buffer)
    }

    /// Allocates a destination large enough for `byte_len` input bytes.
    pub(crate) fn allocate_for(byte_len: usize, encoding: TextEncoding) -> Result<SecureBuffer<char>> {
        encoding.check_input_len(byte_len)?;
        SecureBuffer::new(encoding.max_char_count(byte_len))
    }

    /// Decodes `input` into a buffer from [`allocate_for`](Self::allocate_for).
    pub(crate) fn decode_into(
        input: &[u8],
        encoding: TextEncoding,
        mut buffer: SecureBuffer<char>,
    ) -> Result<Self> {
        let decoded = buffer.as_mut_slice().and_then(|out| {
            let mut written = 0;
            let mut decoder = encoding.decoder();
            decoder.decode(input, out, &mut written)?;
            decoder.finish()?;
            Ok(written)
        });
        Self::finish_buffer(buffer, decoded)
    }

    /// Decodes exactly `byte_len` bytes pulled from `reader`.
    ///
    /// Bytes are read through a small wiped stack chunk and turned into
    /// characters immediately; they are never collected into a byte buffer.
    pub(crate) fn decode_reader<R: Read + ?Sized>(
        reader: &mut R,
        byte_len: usize,
        encoding: TextEncoding,
    ) -> Result<Self> {
        let mut buffer = Self::allocate_for(byte_len, encoding)?;
        let decoded = buffer.as_mut_slice().and_then(|out| {
            let mut chunk = Zeroizing::new([0u8; READ_CHUNK]);
            let mut decoder = encoding.decoder();
            let mut written = 0;
            let mut remaining = byte_len;
            while remaining > 0 {
                let step = remaining.min(READ_CHUNK);
                reader.read_exact(&mut chunk[..step]).map_err(|e| match e.kind() {
                    io::ErrorKind::UnexpectedEof => SecretError::Format(format!(
                        "stream ended {} bytes short of the declared length {}",
                        remaining, byte_len
                    )),
                    _ => SecretError::Io(e),
                })?;
                decoder.decode(&chunk[..step], out, &mut written)?;
                remaining -= step;
            }
            decoder.finish()?;
            Ok(written)
        });
        Self::finish_buffer(buffer, decoded)
    }

    fn finish_buffer(mut buffer: SecureBuffer<char>, decoded: Result<usize>) -> Result<Self> {
        match decoded.and_then(|count| buffer.set_logical_len(count)) {
            Ok(()) => Ok(Self { buffer }),
            Err(e) => {
                buffer.dispose();
                Err(e)
            }
        }
    }

    /// Number of characters. Zero once disposed.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Borrows the characters.
    pub fn chars(&self) -> Result<&[char]> {
        self.buffer.as_slice()
    }

    /// Compares against `other` without early exit on the first mismatch.
    pub fn eq_str(&self, other: &str) -> Result<bool> {
        let chars = self.chars()?;
        let mut equal = subtle::Choice::from(u8::from(chars.len() == other.chars().count()));
        for (a, b) in chars.iter().zip(other.chars()) {
            equal &= u32::from(*a).ct_eq(&u32::from(b));
        }
        Ok(bool::from(equal))
    }

    /// Encodes the characters back into a new [`SecretBytes`].
    pub fn encode(&self, encoding: TextEncoding) -> Result<SecretBytes> {
        let chars = self.chars()?;
        SecretBytes::with_len(encoding.encoded_len(chars), |out| encoding.encode_into(chars, out))
    }

    pub fn is_disposed(&self) -> bool {
        self.buffer.is_released()
    }

    /// Wipes the characters. Idempotent.
    pub fn dispose(&mut self) {
        self.buffer.dispose();
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretString")
            .field("len", &self.len())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
