mod common;

use proptest::prelude::*;
use securesecrets::{SecretBytes, SecretError, SecretString, TextEncoding};
use std::fs;

#[test]
fn test_from_bytes_copies_without_wiping_source() {
    common::init_logging();
    let source = b"api-token-123".to_vec();
    let secret = SecretBytes::from_bytes(&source).unwrap();

    assert_eq!(secret.len(), source.len());
    assert_eq!(secret.as_bytes().unwrap(), source.as_slice());
    assert_eq!(source, b"api-token-123");
}

#[test]
fn test_from_bytes_wiping_clears_source() {
    let mut source = b"api-token-123".to_vec();
    let secret = SecretBytes::from_bytes_wiping(&mut source).unwrap();

    assert!(source.iter().all(|&b| b == 0));
    assert!(secret.ct_eq(b"api-token-123").unwrap());
}

#[test]
fn test_random_secret() {
    let a = SecretBytes::random(32).unwrap();
    let b = SecretBytes::random(32).unwrap();
    assert_eq!(a.len(), 32);
    assert!(!a.ct_eq(b.as_bytes().unwrap()).unwrap());
}

#[test]
fn test_dispose_is_idempotent_and_blocks_access() {
    let mut secret = SecretBytes::from_bytes(b"secret").unwrap();
    secret.dispose();
    secret.dispose();

    assert!(secret.is_disposed());
    assert_eq!(secret.len(), 0);
    assert!(matches!(secret.as_bytes(), Err(SecretError::Released(_))));
    assert!(matches!(
        secret.to_string_secret(TextEncoding::Utf8),
        Err(SecretError::Released(_))
    ));
}

#[test]
fn test_ascii_masks_to_seven_bits() {
    let secret = SecretBytes::from_bytes(&[0xFF, 0x41]).unwrap();
    let text = secret.to_string_secret(TextEncoding::Ascii).unwrap();
    assert_eq!(text.chars().unwrap(), &['\u{7F}', 'A']);
}

#[test]
fn test_utf16_big_endian_pairs() {
    let secret = SecretBytes::from_bytes(&[0x00, 0x41]).unwrap();
    let text = SecretString::decode(&secret, TextEncoding::Utf16).unwrap();
    assert_eq!(text.chars().unwrap(), &['A']);

    let odd = SecretBytes::from_bytes(&[0x00, 0x41, 0x00]).unwrap();
    let err = odd.to_string_secret(TextEncoding::Utf16).unwrap_err();
    assert!(matches!(err, SecretError::Format(_)));
}

#[test]
fn test_invalid_utf8_is_format_error() {
    let secret = SecretBytes::from_bytes(&[b'o', b'k', 0xFF]).unwrap();
    let err = secret.to_string_secret(TextEncoding::Utf8).unwrap_err();
    assert!(matches!(err, SecretError::Format(_)));
}

#[test]
fn test_encode_round_trip_utf16() {
    let secret = SecretBytes::from_bytes("pässwörd 🔑".as_bytes()).unwrap();
    let text = secret.to_string_secret(TextEncoding::Utf8).unwrap();

    let utf16 = text.encode(TextEncoding::Utf16).unwrap();
    let back = utf16.to_string_secret(TextEncoding::Utf16).unwrap();
    assert!(back.eq_str("pässwörd 🔑").unwrap());
}

#[test]
fn test_write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secret.bin");

    let content: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
    let secret = SecretBytes::from_bytes(&content).unwrap();
    secret.write_to_file(&path).unwrap();
    assert_eq!(fs::read(&path).unwrap(), content);

    // Overwrites rather than appends.
    let short = SecretBytes::from_bytes(b"tiny").unwrap();
    short.write_to_file(&path).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"tiny");
}

#[test]
fn test_write_to_file_after_dispose_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never.bin");

    let mut secret = SecretBytes::from_bytes(b"gone").unwrap();
    secret.dispose();
    assert!(matches!(secret.write_to_file(&path), Err(SecretError::Released(_))));
    assert!(!path.exists());
}

proptest! {
    #[test]
    fn prop_utf8_round_trip(text in ".{0,64}") {
        let secret = SecretBytes::from_bytes(text.as_bytes()).unwrap();
        let decoded = secret.to_string_secret(TextEncoding::Utf8).unwrap();
        let encoded = decoded.encode(TextEncoding::Utf8).unwrap();
        prop_assert_eq!(encoded.as_bytes().unwrap(), text.as_bytes());
        prop_assert_eq!(decoded.len(), text.chars().count());
    }

    #[test]
    fn prop_ascii_is_low_seven_bits(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let secret = SecretBytes::from_bytes(&bytes).unwrap();
        let decoded = secret.to_string_secret(TextEncoding::Ascii).unwrap();
        let chars = decoded.chars().unwrap();
        prop_assert_eq!(chars.len(), bytes.len());
        for (c, b) in chars.iter().zip(&bytes) {
            prop_assert_eq!(*c as u32, u32::from(b & 0x7F));
        }
    }
}
