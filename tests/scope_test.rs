mod common;

use securesecrets::{SecretBytes, SecretError, SecretsScope, SecureSecret, TextEncoding};

#[test]
fn test_encrypt_decrypt_same_scope() {
    common::init_logging();
    let scope = SecretsScope::new().unwrap();
    let plaintext = b"database password";

    let sealed = scope.encrypt(plaintext).unwrap();
    assert_eq!(sealed.plaintext_len(), plaintext.len());
    assert_eq!(sealed.ciphertext().len(), 12 + plaintext.len() + 16);
    assert!(!sealed
        .ciphertext()
        .windows(plaintext.len())
        .any(|w| w == plaintext));

    let decrypted = scope.decrypt(&sealed).unwrap();
    assert_eq!(decrypted.as_bytes().unwrap(), plaintext);
}

#[test]
fn test_nonces_differ_between_encryptions() {
    let scope = SecretsScope::new().unwrap();
    let a = scope.encrypt(b"same input").unwrap();
    let b = scope.encrypt(b"same input").unwrap();
    assert_ne!(a.ciphertext(), b.ciphertext());
}

#[test]
fn test_scope_isolation() {
    let first = SecretsScope::new().unwrap();
    let second = SecretsScope::new().unwrap();

    let sealed = first.encrypt(b"only for the first scope").unwrap();
    let err = second.decrypt(&sealed).unwrap_err();
    assert!(matches!(err, SecretError::Crypto(_)));

    let err = second.decrypt_string(&sealed, TextEncoding::Utf8).unwrap_err();
    assert!(matches!(err, SecretError::Crypto(_)));
}

#[test]
fn test_disposed_scope_fails() {
    let mut scope = SecretsScope::new().unwrap();
    let sealed = scope.encrypt(b"short lived").unwrap();

    scope.dispose();
    scope.dispose();
    assert!(scope.is_disposed());

    assert!(matches!(scope.decrypt(&sealed), Err(SecretError::Released(_))));
    assert!(matches!(scope.encrypt(b"x"), Err(SecretError::Released(_))));
}

#[test]
fn test_tampered_ciphertext_fails() {
    let scope = SecretsScope::new().unwrap();
    let sealed = scope.encrypt(b"integrity").unwrap();

    let mut bytes = sealed.ciphertext().to_vec();
    bytes[14] ^= 0x01;
    let tampered = SecureSecret::new(&bytes, sealed.plaintext_len());
    assert!(matches!(scope.decrypt(&tampered), Err(SecretError::Crypto(_))));
}

#[test]
fn test_length_mismatch_is_format_error() {
    let scope = SecretsScope::new().unwrap();
    let sealed = scope.encrypt(b"twelve bytes").unwrap();

    let wrong = SecureSecret::new(sealed.ciphertext(), sealed.plaintext_len() + 1);
    assert!(matches!(scope.decrypt(&wrong), Err(SecretError::Format(_))));

    let truncated = SecureSecret::new(&sealed.ciphertext()[..20], sealed.plaintext_len());
    assert!(matches!(scope.decrypt(&truncated), Err(SecretError::Format(_))));
}

#[test]
fn test_empty_plaintext() {
    let scope = SecretsScope::new().unwrap();
    let sealed = scope.encrypt(b"").unwrap();
    assert_eq!(sealed.ciphertext().len(), 28);

    let decrypted = scope.decrypt(&sealed).unwrap();
    assert!(decrypted.is_empty());

    let text = scope.decrypt_string(&sealed, TextEncoding::Utf8).unwrap();
    assert!(text.is_empty());
}

#[test]
fn test_secure_secret_survives_json_round_trip() {
    let scope = SecretsScope::new().unwrap();
    let mut password = SecretBytes::from_bytes(b"correct horse battery staple").unwrap();
    let sealed = scope.encrypt_secret(&password).unwrap();
    password.dispose();

    let json = serde_json::to_string(&sealed).unwrap();
    assert!(json.contains("\"Ciphertext\""));
    assert!(json.contains("\"Length\""));

    let restored: SecureSecret = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, sealed);

    let mut text = scope.decrypt_string(&restored, TextEncoding::Utf8).unwrap();
    assert!(text.eq_str("correct horse battery staple").unwrap());
    assert_eq!(text.len(), 28);
    text.dispose();
    assert!(text.is_disposed());

    let other = SecretsScope::new().unwrap();
    assert!(matches!(
        other.decrypt_string(&restored, TextEncoding::Utf8),
        Err(SecretError::Crypto(_))
    ));
}

#[test]
fn test_decrypt_string_with_utf16_plaintext() {
    let scope = SecretsScope::new().unwrap();
    let sealed = scope.encrypt(&[0x00, b'o', 0x00, b'k']).unwrap();

    let text = scope.decrypt_string(&sealed, TextEncoding::Utf16).unwrap();
    assert_eq!(text.chars().unwrap(), &['o', 'k']);
}

#[test]
fn test_decrypt_string_invalid_text_is_format_error() {
    let scope = SecretsScope::new().unwrap();
    let sealed = scope.encrypt(&[0xC3]).unwrap();
    assert!(matches!(
        scope.decrypt_string(&sealed, TextEncoding::Utf8),
        Err(SecretError::Format(_))
    ));
}
