use crate::crypto::{sealed_len, GCM_NONCE_SIZE, GCM_TAG_SIZE};
use crate::error::{Result, SecretError};
use serde::{Deserialize, Serialize};

/// An encrypted-at-rest secret: AES-256-GCM ciphertext plus the length of the
/// plaintext it protects.
///
/// A `SecureSecret` holds no key and no plaintext, so it can be cloned, logged
/// and persisted freely. Turning it back into plaintext takes the
/// [`SecretsScope`](crate::SecretsScope) that produced it.
///
/// The ciphertext layout is `nonce (12 bytes) || body || tag (16 bytes)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureSecret {
    #[serde(rename = "Ciphertext", with = "base64_bytes")]
    ciphertext: Vec<u8>,
    #[serde(rename = "Length")]
    plaintext_len: usize,
}

impl SecureSecret {
    /// Stores a private copy of `ciphertext` with its declared plaintext length.
    pub fn new(ciphertext: &[u8], plaintext_len: usize) -> Self {
        Self {
            ciphertext: ciphertext.to_vec(),
            plaintext_len,
        }
    }

    pub(crate) fn from_parts(ciphertext: Vec<u8>, plaintext_len: usize) -> Self {
        Self {
            ciphertext,
            plaintext_len,
        }
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Length in bytes of the plaintext once decrypted.
    pub fn plaintext_len(&self) -> usize {
        self.plaintext_len
    }

    /// Checks the ciphertext length against the declared plaintext length.
    pub fn validate(&self) -> Result<()> {
        match sealed_len(self.plaintext_len) {
            Some(expected) if expected == self.ciphertext.len() => Ok(()),
            _ => Err(SecretError::Format(format!(
                "ciphertext of {} bytes cannot hold {} plaintext bytes",
                self.ciphertext.len(),
                self.plaintext_len
            ))),
        }
    }

    /// Splits the ciphertext into nonce, body and tag.
    pub(crate) fn parts(&self) -> Result<(&[u8], &[u8], &[u8])> {
        self.validate()?;
        let (nonce, rest) = self.ciphertext.split_at(GCM_NONCE_SIZE);
        let (body, tag) = rest.split_at(rest.len() - GCM_TAG_SIZE);
        Ok((nonce, body, tag))
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_checks_length() {
        let ok = SecureSecret::new(&[0u8; 12 + 5 + 16], 5);
        assert!(ok.validate().is_ok());

        let short = SecureSecret::new(&[0u8; 20], 5);
        assert!(matches!(short.validate(), Err(SecretError::Format(_))));

        let overflow = SecureSecret::new(&[0u8; 28], usize::MAX);
        assert!(overflow.validate().is_err());
    }

    #[test]
    fn test_serde_shape() {
        let secret = SecureSecret::new(&[1, 2, 3], 0);
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, r#"{"Ciphertext":"AQID","Length":0}"#);

        let back: SecureSecret = serde_json::from_str(&json).unwrap();
        assert_eq!(back, secret);
    }
}
