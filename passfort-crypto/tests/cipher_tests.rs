use passfort_crypto::{decrypt, derive_key, encrypt, CryptoError, KdfParams, Salt, KEY_SIZE};

fn test_key() -> passfort_crypto::DerivedKey {
    let salt = Salt::from_bytes([7u8; 16]);
    derive_key("correct horse battery staple", &salt, &KdfParams::fast_insecure()).unwrap()
}

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = test_key();
    let plaintext = b"the quick brown fox";

    let encrypted = encrypt(&key, plaintext).unwrap();
    let recovered = decrypt(&key, &encrypted).unwrap();

    assert_eq!(recovered, plaintext);
}

#[test]
fn roundtrip_empty_plaintext() {
    let key = test_key();
    let encrypted = encrypt(&key, b"").unwrap();
    assert_eq!(decrypt(&key, &encrypted).unwrap(), b"");
}

#[test]
fn nonces_are_unique_per_encryption() {
    let key = test_key();
    let a = encrypt(&key, b"same plaintext").unwrap();
    let b = encrypt(&key, b"same plaintext").unwrap();
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn wrong_key_fails_authentication() {
    let key = test_key();
    let other = derive_key(
        "a different password",
        &Salt::from_bytes([7u8; 16]),
        &KdfParams::fast_insecure(),
    )
    .unwrap();

    let encrypted = encrypt(&key, b"secret").unwrap();
    let result = decrypt(&other, &encrypted);
    assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
}

#[test]
fn tampered_ciphertext_fails_authentication() {
    let key = test_key();
    let mut encrypted = encrypt(&key, b"secret").unwrap();

    for i in 0..encrypted.ciphertext.len() {
        encrypted.ciphertext[i] ^= 0xFF;
        let result = decrypt(&key, &encrypted);
        assert!(
            matches!(result, Err(CryptoError::AuthenticationFailure)),
            "flipping ciphertext byte {i} must be detected"
        );
        encrypted.ciphertext[i] ^= 0xFF;
    }
}

#[test]
fn tampered_nonce_fails_authentication() {
    let key = test_key();
    let mut encrypted = encrypt(&key, b"secret").unwrap();
    encrypted.nonce[0] ^= 0x01;
    assert!(matches!(
        decrypt(&key, &encrypted),
        Err(CryptoError::AuthenticationFailure)
    ));
}

#[test]
fn same_password_same_salt_derives_same_key() {
    let salt = Salt::from_bytes([3u8; 16]);
    let a = derive_key("pw", &salt, &KdfParams::fast_insecure()).unwrap();
    let b = derive_key("pw", &salt, &KdfParams::fast_insecure()).unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
    assert_eq!(a.as_bytes().len(), KEY_SIZE);
}

#[test]
fn different_salt_derives_different_key() {
    let a = derive_key("pw", &Salt::from_bytes([1u8; 16]), &KdfParams::fast_insecure()).unwrap();
    let b = derive_key("pw", &Salt::from_bytes([2u8; 16]), &KdfParams::fast_insecure()).unwrap();
    assert_ne!(a.as_bytes(), b.as_bytes());
}

#[test]
fn derived_key_debug_is_redacted() {
    let key = test_key();
    let rendered = format!("{key:?}");
    assert!(rendered.contains("redacted"));
}
