use crate::buffer::SecureBuffer;
use crate::bytes::SecretBytes;
use crate::crypto::{fill_random, sealed_len, GCM_NONCE_SIZE, GCM_TAG_SIZE, KEY_SIZE};
use crate::decrypted::{DecryptedSecret, DecryptedStringSecret};
use crate::encoding::TextEncoding;
use crate::error::{Result, SecretError};
use crate::secure::SecureSecret;
use crate::stream::SecretMemoryStream;
use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use log::debug;
use std::fmt;

/// A decryption context owning one AES-256-GCM key.
///
/// The key is generated from the OS RNG when the scope is created and exists
/// only inside the scope. [`SecureSecret`]s encrypted by a scope can only be
/// decrypted by that same scope; once it is disposed they are unrecoverable.
///
/// A scope is neither `Clone` nor serializable. Use one scope per
/// secret-handling session and keep it on one thread at a time.
///
/// # Example
///
/// ```rust
/// use securesecrets::{SecretsScope, TextEncoding};
///
/// let scope = SecretsScope::new().unwrap();
/// let sealed = scope.encrypt(b"s3cr3t").unwrap();
///
/// let plain = scope.decrypt(&sealed).unwrap();
/// assert!(plain.ct_eq(b"s3cr3t").unwrap());
///
/// let text = scope.decrypt_string(&sealed, TextEncoding::Utf8).unwrap();
/// assert!(text.eq_str("s3cr3t").unwrap());
/// ```
pub struct SecretsScope {
    cipher: Option<Box<Aes256Gcm>>,
}

impl SecretsScope {
    /// Opens a scope with a freshly generated key.
    pub fn new() -> Result<Self> {
        let mut key = SecureBuffer::<u8>::new(KEY_SIZE)?;
        fill_random(key.as_mut_slice()?);
        let cipher = Aes256Gcm::new_from_slice(key.as_slice()?)
            .map_err(|e| SecretError::Crypto(format!("invalid key: {}", e)));
        key.dispose();

        debug!("opened secrets scope");
        Ok(Self {
            cipher: Some(Box::new(cipher?)),
        })
    }

    fn cipher(&self) -> Result<&Aes256Gcm> {
        self.cipher
            .as_deref()
            .ok_or(SecretError::Released("secrets scope"))
    }

    pub fn is_disposed(&self) -> bool {
        self.cipher.is_none()
    }

    /// Encrypts `plaintext` under this scope's key with a random nonce.
    ///
    /// The plaintext is staged only in secure memory while it is encrypted.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<SecureSecret> {
        let cipher = self.cipher()?;
        let total = sealed_len(plaintext.len())
            .ok_or_else(|| SecretError::Range("plaintext too large to encrypt".to_string()))?;

        let mut staging = SecureBuffer::from_slice(plaintext)?;
        let mut nonce = [0u8; GCM_NONCE_SIZE];
        fill_random(&mut nonce);

        let sealed = staging.as_mut_slice().and_then(|body| {
            let tag = cipher
                .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", body)
                .map_err(|e| SecretError::Crypto(format!("encryption failed: {}", e)))?;

            let mut ciphertext = Vec::with_capacity(total);
            ciphertext.extend_from_slice(&nonce);
            ciphertext.extend_from_slice(body);
            ciphertext.extend_from_slice(tag.as_slice());
            Ok(ciphertext)
        });
        staging.dispose();

        Ok(SecureSecret::from_parts(sealed?, plaintext.len()))
    }

    /// Encrypts the content of an existing secret.
    pub fn encrypt_secret(&self, secret: &SecretBytes) -> Result<SecureSecret> {
        self.encrypt(secret.as_bytes()?)
    }

    /// Decrypts `secret` into ephemeral plaintext.
    ///
    /// # Errors
    ///
    /// * [`SecretError::Released`] if the scope has been disposed.
    /// * [`SecretError::Format`] if the ciphertext length does not match the
    ///   declared plaintext length.
    /// * [`SecretError::Crypto`] if the ciphertext does not authenticate under
    ///   this scope's key, typically because another scope produced it. The
    ///   partially decrypted buffer is wiped first.
    pub fn decrypt(&self, secret: &SecureSecret) -> Result<DecryptedSecret> {
        let stream = self.decrypt_to_stream(secret)?;
        Ok(DecryptedSecret::new(stream.into_secret()?))
    }

    /// Decrypts `secret` and decodes the plaintext into characters.
    ///
    /// GCM releases no plaintext before the tag has been checked over the
    /// whole body, so the authenticated bytes are held in one secure staging
    /// stream while they are decoded. The stream is wiped before this returns,
    /// whether decoding succeeds or not.
    pub fn decrypt_string(
        &self,
        secret: &SecureSecret,
        encoding: TextEncoding,
    ) -> Result<DecryptedStringSecret> {
        let staged = self.decrypt_to_stream(secret)?;
        decode_staged(staged, secret.plaintext_len(), encoding)
    }

    fn decrypt_to_stream(&self, secret: &SecureSecret) -> Result<SecretMemoryStream> {
        let cipher = self.cipher()?;
        let (nonce, body, tag) = secret.parts()?;
        debug_assert_eq!(tag.len(), GCM_TAG_SIZE);

        let mut stream = SecretMemoryStream::with_capacity(secret.plaintext_len())?;
        let opened = stream.write_bytes(body).and_then(|()| {
            cipher
                .decrypt_in_place_detached(
                    Nonce::from_slice(nonce),
                    b"",
                    stream.as_mut_slice()?,
                    Tag::from_slice(tag),
                )
                .map_err(|_| {
                    SecretError::Crypto(
                        "ciphertext does not authenticate under this scope's key".to_string(),
                    )
                })
        });

        match opened {
            Ok(()) => Ok(stream),
            Err(e) => {
                stream.dispose();
                Err(e)
            }
        }
    }

    /// Destroys the key. Secrets sealed by this scope can no longer be
    /// decrypted by anyone. Idempotent.
    pub fn dispose(&mut self) {
        if self.cipher.take().is_some() {
            debug!("disposed secrets scope");
        }
    }
}

/// Decodes `byte_len` authenticated bytes from `staged`, then wipes it.
fn decode_staged(
    staged: SecretMemoryStream,
    byte_len: usize,
    encoding: TextEncoding,
) -> Result<DecryptedStringSecret> {
    let mut reader = SecretMemoryStream::from_secret(staged.into_secret()?);
    let decoded = DecryptedStringSecret::from_reader(&mut reader, byte_len, encoding);
    reader.dispose();
    decoded
}

impl fmt::Debug for SecretsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsScope")
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
