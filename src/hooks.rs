//! Format-agnostic decoding of secret fields, with cleanup tracking.
//!
//! A document decoder hands the raw bytes of a secret-typed field to
//! [`decode_base64_secret`] or [`decode_utf8_secret`]. The value is decoded
//! straight into secure memory, never into an ordinary `String` or `Vec`.
//!
//! While a [`SecretTracker`] is running on the current thread, every secret
//! either hook allocates is registered with it, so a failed document can be
//! checked for secrets that outlived the failure.

use crate::buffer::{ReleaseProbe, SecureBuffer};
use crate::bytes::SecretBytes;
use crate::encoding::TextEncoding;
use crate::error::{Result, SecretError};
use crate::string::SecretString;
use base64::{engine::general_purpose, Engine as _};
use log::{debug, error};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::sync::Arc;

type ProbeList = Arc<Mutex<Vec<ReleaseProbe>>>;

thread_local! {
    static ACTIVE_TRACKERS: RefCell<Vec<ProbeList>> = const { RefCell::new(Vec::new()) };
}

fn register(probe: ReleaseProbe) {
    ACTIVE_TRACKERS.with(|active| {
        if let Some(probes) = active.borrow().last() {
            probes.lock().push(probe);
        }
    });
}

/// Decodes Base64 text into a new [`SecretBytes`].
///
/// The output buffer is sized from the Base64 length estimate and narrowed to
/// the decoded length. Invalid input wipes the buffer and yields a format
/// error that does not echo any of the input.
pub fn decode_base64_secret(encoded: &[u8]) -> Result<SecretBytes> {
    let mut buffer = SecureBuffer::<u8>::new(base64::decoded_len_estimate(encoded.len()))?;
    register(buffer.probe());

    let decoded = buffer.as_mut_slice().and_then(|out| {
        general_purpose::STANDARD
            .decode_slice(encoded, out)
            .map_err(|_| SecretError::Format("secret field is not valid Base64".to_string()))
    });

    match decoded.and_then(|len| buffer.set_logical_len(len)) {
        Ok(()) => Ok(SecretBytes::from_buffer(buffer)),
        Err(e) => {
            buffer.dispose();
            Err(e)
        }
    }
}

/// Decodes raw UTF-8 bytes into a new [`SecretString`].
pub fn decode_utf8_secret(raw: &[u8]) -> Result<SecretString> {
    let mut buffer = SecretString::allocate_for(raw.len(), TextEncoding::Utf8)?;
    register(buffer.probe());
    SecretString::decode_into(raw, TextEncoding::Utf8, buffer)
}

/// Records the secrets the decoding hooks create while it runs.
///
/// # Example
///
/// ```rust
/// use securesecrets::{SecretBytes, SecretTracker};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Credentials {
///     key: SecretBytes,
///     pin: SecretBytes,
/// }
///
/// let tracker = SecretTracker::new();
/// let result: Result<Credentials, _> =
///     tracker.run(|| serde_json::from_str(r#"{"key":"a2V5","pin":"!!"}"#));
///
/// assert!(result.is_err());
/// assert_eq!(tracker.created(), 2);
/// assert_eq!(tracker.outstanding(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SecretTracker {
    probes: ProbeList,
}

struct ActiveGuard;

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE_TRACKERS.with(|active| {
            active.borrow_mut().pop();
        });
    }
}

impl SecretTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `decode` with this tracker collecting every secret the hooks
    /// create on the current thread.
    ///
    /// When `decode` fails, serde has already dropped every partially built
    /// value and the hooks have wiped their own partial buffers; the tracker
    /// then verifies that nothing it saw is still live.
    pub fn run<T, E, F>(&self, decode: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let result = {
            ACTIVE_TRACKERS.with(|active| active.borrow_mut().push(Arc::clone(&self.probes)));
            let _guard = ActiveGuard;
            decode()
        };

        if result.is_err() {
            let outstanding = self.outstanding();
            if outstanding > 0 {
                error!(
                    "{} of {} secrets survived a failed decode",
                    outstanding,
                    self.created()
                );
            } else {
                debug!("failed decode released all {} secrets", self.created());
            }
        }
        result
    }

    /// Secrets created under this tracker so far.
    pub fn created(&self) -> usize {
        self.probes.lock().len()
    }

    /// Tracked secrets that have not been released yet.
    pub fn outstanding(&self) -> usize {
        self.probes.lock().iter().filter(|p| !p.is_released()).count()
    }
}
