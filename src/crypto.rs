use rand::{rngs::OsRng, RngCore};

/// AES-256 key size.
pub(crate) const KEY_SIZE: usize = 32;
pub(crate) const GCM_NONCE_SIZE: usize = 12;
pub(crate) const GCM_TAG_SIZE: usize = 16;

/// Fills a buffer with random bytes using a cryptographically secure RNG
pub(crate) fn fill_random(buffer: &mut [u8]) {
    OsRng.fill_bytes(buffer);
}

/// Ciphertext length for `plaintext_len` bytes: nonce, body and tag.
pub(crate) fn sealed_len(plaintext_len: usize) -> Option<usize> {
    plaintext_len.checked_add(GCM_NONCE_SIZE + GCM_TAG_SIZE)
}
