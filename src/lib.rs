//! # Secure Secrets
//!
//! Types for holding secret bytes and characters in memory with a narrow,
//! explicit lifetime.
//!
//! Every secret lives in a [`SecureBuffer`]: a dedicated page mapping that the
//! allocator never moves, optionally locked into RAM, and zeroed in full before
//! it is released. Secrets can also be kept encrypted inside the process as
//! [`SecureSecret`] values and turned back into plaintext only through the
//! [`SecretsScope`] that sealed them.
//!
//! ## Features
//!
//! - **Zero on release**: the whole mapping is wiped on `dispose()` or drop
//! - **Address stability**: buffers come from `mmap`, never from a moving heap
//! - **RAM locking**: buffers are `mlock`ed unless the [`MemoryPolicy`] says otherwise
//! - **Scoped decryption**: per-scope AES-256-GCM keys that never leave the scope
//! - **Secure streams**: a growable `Read`/`Write`/`Seek` store over secure memory
//! - **serde hooks**: secret fields decode straight into secure memory
//!
//! ## Basic Usage
//!
//! ```rust
//! use securesecrets::{SecretBytes, SecretsScope, TextEncoding};
//!
//! let mut password = SecretBytes::from_bytes(b"correct horse battery staple").unwrap();
//!
//! let scope = SecretsScope::new().unwrap();
//! let sealed = scope.encrypt_secret(&password).unwrap();
//! password.dispose();
//!
//! // Later, materialize the plaintext only for as long as it is needed.
//! let mut plain = scope.decrypt_string(&sealed, TextEncoding::Utf8).unwrap();
//! assert!(plain.eq_str("correct horse battery staple").unwrap());
//! plain.dispose();
//! ```
//!
//! ## Deserializing Secrets
//!
//! ```rust
//! use securesecrets::{SecretBytes, SecretString};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Config {
//!     name: String,
//!     api_key: SecretBytes,
//!     passphrase: SecretString,
//! }
//!
//! let json = br#"{"name":"svc","api_key":"a2V5","passphrase":"open sesame"}"#;
//! let config: Config = securesecrets::de::from_json_slice(json).unwrap();
//! assert_eq!(config.name, "svc");
//! assert!(config.api_key.ct_eq(b"key").unwrap());
//! assert!(config.passphrase.eq_str("open sesame").unwrap());
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result<T>`](Result), whose error type
//! [`SecretError`] tells apart released resources, malformed input and
//! ciphertext that does not belong to the scope.

/// Address-stable, zero-on-release storage
pub mod buffer;

/// Secret byte sequences
pub mod bytes;

mod crypto;

/// Ephemeral plaintext produced by a scope
pub mod decrypted;

/// serde support for secret fields
pub mod de;

/// Text encodings for byte/character conversion
pub mod encoding;

/// Error types
pub mod error;

/// Format-agnostic secret decoding and cleanup tracking
pub mod hooks;

/// Memory allocation settings
pub mod policy;

/// Scoped decryption
pub mod scope;

/// Encrypted-at-rest secrets
pub mod secure;

/// Growable streams over secure memory
pub mod stream;

/// Secret character sequences
pub mod string;

// Re-export key types
pub use crate::buffer::{ReleaseProbe, SecureBuffer, SecureElement};
pub use crate::bytes::SecretBytes;
pub use crate::decrypted::{DecryptedSecret, DecryptedStringSecret};
pub use crate::encoding::TextEncoding;
pub use crate::error::{Result, SecretError};
pub use crate::hooks::{decode_base64_secret, decode_utf8_secret, SecretTracker};
pub use crate::policy::{memory_policy, set_memory_policy, MemoryPolicy};
pub use crate::scope::SecretsScope;
pub use crate::secure::SecureSecret;
pub use crate::stream::{SecretMemoryStream, MAX_STREAM_LENGTH, MIN_STREAM_CAPACITY};
pub use crate::string::SecretString;
