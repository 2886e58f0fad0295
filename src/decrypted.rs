use crate::bytes::SecretBytes;
use crate::encoding::TextEncoding;
use crate::error::Result;
use crate::string::SecretString;
use std::fmt;
use std::io::Read;
use std::ops::{Deref, DerefMut};

/// Plaintext bytes produced by [`SecretsScope::decrypt`](crate::SecretsScope::decrypt).
///
/// Meant to live only as long as the operation that needs it; dispose it (or
/// let it drop) as soon as it has been consumed.
pub struct DecryptedSecret(SecretBytes);

impl DecryptedSecret {
    pub(crate) fn new(bytes: SecretBytes) -> Self {
        Self(bytes)
    }
}

impl Deref for DecryptedSecret {
    type Target = SecretBytes;

    fn deref(&self) -> &SecretBytes {
        &self.0
    }
}

impl DerefMut for DecryptedSecret {
    fn deref_mut(&mut self) -> &mut SecretBytes {
        &mut self.0
    }
}

impl fmt::Debug for DecryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DecryptedSecret").field(&self.0).finish()
    }
}

/// Plaintext characters produced by decrypting straight into a decoder.
pub struct DecryptedStringSecret(SecretString);

impl DecryptedStringSecret {
    /// Decodes `byte_len` bytes pulled from a decrypting `reader`.
    ///
    /// The plaintext is turned into characters as it is read, without first
    /// being gathered into a separate byte buffer.
    pub fn from_reader<R: Read + ?Sized>(
        reader: &mut R,
        byte_len: usize,
        encoding: TextEncoding,
    ) -> Result<Self> {
        SecretString::decode_reader(reader, byte_len, encoding).map(Self)
    }
}

impl Deref for DecryptedStringSecret {
    type Target = SecretString;

    fn deref(&self) -> &SecretString {
        &self.0
    }
}

impl DerefMut for DecryptedStringSecret {
    fn deref_mut(&mut self) -> &mut SecretString {
        &mut self.0
    }
}

impl fmt::Debug for DecryptedStringSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DecryptedStringSecret").field(&self.0).finish()
    }
}
