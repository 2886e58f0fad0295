//! serde integration for secret fields.
//!
//! `SecretBytes` fields are read from a string (or byte string) holding Base64;
//! `SecretString` fields are read from a string whose UTF-8 bytes become the
//! secret characters. Both decode through [`crate::hooks`] and so take part in
//! any running [`SecretTracker`].
//!
//! Serializing either type is refused: secrets are input-only.
//!
//! A JSON string containing escape sequences is unescaped by `serde_json`
//! into its own scratch buffer before it reaches the visitor. That scratch
//! copy belongs to the parser and is not zeroized here; secrets without
//! escapes are borrowed straight from the input.

use crate::bytes::SecretBytes;
use crate::error::{self, SecretError};
use crate::hooks::{decode_base64_secret, decode_utf8_secret, SecretTracker};
use crate::string::SecretString;
use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

const REFUSE_SERIALIZE: &str = "secret values cannot be serialized";

struct SecretBytesVisitor;

impl Visitor<'_> for SecretBytesVisitor {
    type Value = SecretBytes;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a Base64-encoded secret")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<SecretBytes, E> {
        self.visit_bytes(v.as_bytes())
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<SecretBytes, E> {
        decode_base64_secret(v).map_err(E::custom)
    }

    fn visit_string<E: de::Error>(self, mut v: String) -> Result<SecretBytes, E> {
        let decoded = decode_base64_secret(v.as_bytes());
        v.zeroize();
        decoded.map_err(E::custom)
    }

    fn visit_byte_buf<E: de::Error>(self, mut v: Vec<u8>) -> Result<SecretBytes, E> {
        let decoded = decode_base64_secret(&v);
        v.zeroize();
        decoded.map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for SecretBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(SecretBytesVisitor)
    }
}

struct SecretStringVisitor;

impl Visitor<'_> for SecretStringVisitor {
    type Value = SecretString;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a secret string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<SecretString, E> {
        decode_utf8_secret(v.as_bytes()).map_err(E::custom)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<SecretString, E> {
        decode_utf8_secret(v).map_err(E::custom)
    }

    fn visit_string<E: de::Error>(self, mut v: String) -> Result<SecretString, E> {
        let decoded = decode_utf8_secret(v.as_bytes());
        v.zeroize();
        decoded.map_err(E::custom)
    }

    fn visit_byte_buf<E: de::Error>(self, mut v: Vec<u8>) -> Result<SecretString, E> {
        let decoded = decode_utf8_secret(&v);
        v.zeroize();
        decoded.map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(SecretStringVisitor)
    }
}

impl Serialize for SecretBytes {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(ser::Error::custom(REFUSE_SERIALIZE))
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(ser::Error::custom(REFUSE_SERIALIZE))
    }
}

/// Deserializes a JSON document containing secret fields.
///
/// Every secret the document produces is tracked; if decoding fails, all of
/// them have been wiped by the time the error is returned.
pub fn from_json_slice<T: DeserializeOwned>(input: &[u8]) -> error::Result<T> {
    let tracker = SecretTracker::new();
    tracker
        .run(|| serde_json::from_slice(input))
        .map_err(|e| SecretError::Format(format!("secret document: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_is_refused() {
        let secret = SecretBytes::from_bytes(b"abc").unwrap();
        let err = serde_json::to_string(&secret).unwrap_err();
        assert!(err.to_string().contains(REFUSE_SERIALIZE));
    }

    #[test]
    fn test_owned_string_input() {
        let value = serde_json::Value::String("aGk=".to_string());
        let secret: SecretBytes = serde_json::from_value(value).unwrap();
        assert_eq!(secret.as_bytes().unwrap(), b"hi");
    }

    #[test]
    fn test_escaped_string_field() {
        let secret: SecretString = serde_json::from_str(r#""tab\there""#).unwrap();
        assert!(secret.eq_str("tab\there").unwrap());
    }
}
