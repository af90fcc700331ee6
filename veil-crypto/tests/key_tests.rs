use veil_crypto::{CryptoError, EncryptionKey, KEY_SIZE};

#[test]
fn generate_produces_distinct_keys() {
    let a = EncryptionKey::generate();
    let b = EncryptionKey::generate();
    assert_ne!(a.as_bytes(), b.as_bytes());
}

#[test]
fn base64_roundtrip() {
    let key = EncryptionKey::generate();
    let encoded = key.to_base64();
    let decoded = EncryptionKey::from_base64(&encoded).unwrap();
    assert_eq!(key.as_bytes(), decoded.as_bytes());
}

#[test]
fn from_base64_rejects_wrong_length() {
    use base64::{engine::general_purpose::STANDARD, Engine};
    let short = STANDARD.encode([0u8; 16]);
    let err = EncryptionKey::from_base64(&short).unwrap_err();
    assert!(matches!(
        err,
        CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: 16
        }
    ));
}

#[test]
fn from_base64_rejects_garbage() {
    assert!(EncryptionKey::from_base64("!!!not-base64!!!").is_err());
}

#[test]
fn debug_never_prints_key_material() {
    let key = EncryptionKey::from_bytes([0xAB; KEY_SIZE]);
    let rendered = format!("{key:?}");
    assert!(rendered.contains("REDACTED"));
    assert!(!rendered.contains("171")); // 0xAB
    assert!(!rendered.to_lowercase().contains("ab"));
}
