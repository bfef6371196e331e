use passfort_crypto::{
    derive_key, open, open_with, read_salt, seal, seal_with, CryptoError, KdfParams, Salt,
};
use proptest::prelude::*;

const PW: &str = "master password";

fn params() -> KdfParams {
    KdfParams::fast_insecure()
}

#[test]
fn seal_open_roundtrip() {
    let blob = seal(b"vault payload", PW, &params()).unwrap();
    let recovered = open(&blob, PW, &params()).unwrap();
    assert_eq!(recovered, b"vault payload");
}

#[test]
fn wrong_password_is_authentication_failure() {
    let blob = seal(b"vault payload", PW, &params()).unwrap();
    let result = open(&blob, "not the password", &params());
    assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
}

#[test]
fn every_flipped_byte_is_detected_or_rejected() {
    let mut blob = seal(b"vault payload", PW, &params()).unwrap();

    for i in 0..blob.len() {
        blob[i] ^= 0xFF;
        let result = open(&blob, PW, &params());
        // Header corruption surfaces as a format/version error, everything
        // else as an authentication failure. Never a silent success.
        assert!(result.is_err(), "flipping byte {i} went undetected");
        blob[i] ^= 0xFF;
    }
}

#[test]
fn truncated_blob_is_invalid_format() {
    let blob = seal(b"vault payload", PW, &params()).unwrap();
    let result = open(&blob[..10], PW, &params());
    assert!(matches!(result, Err(CryptoError::InvalidFormat(_))));
}

#[test]
fn blob_without_full_tag_is_invalid_format() {
    // An empty payload seals to exactly header + tag; one byte less can
    // never carry a complete authentication tag.
    let blob = seal(b"", PW, &params()).unwrap();
    let result = open(&blob[..blob.len() - 1], PW, &params());
    assert!(matches!(result, Err(CryptoError::InvalidFormat(_))));
}

#[test]
fn foreign_bytes_are_invalid_format() {
    let result = open(&[0u8; 64], PW, &params());
    assert!(matches!(result, Err(CryptoError::InvalidFormat(_))));
}

#[test]
fn unknown_version_is_rejected() {
    let mut blob = seal(b"payload", PW, &params()).unwrap();
    blob[4] = 99; // version byte follows the 4-byte magic
    let result = open(&blob, PW, &params());
    assert!(matches!(result, Err(CryptoError::UnsupportedVersion(99))));
}

#[test]
fn seal_with_keeps_password_openable() {
    // The vault store path: derive once, re-seal many times.
    let salt = Salt::random();
    let key = derive_key(PW, &salt, &params()).unwrap();

    let blob = seal_with(&key, &salt, b"first persist").unwrap();
    assert_eq!(open(&blob, PW, &params()).unwrap(), b"first persist");

    let blob2 = seal_with(&key, &salt, b"second persist").unwrap();
    assert_eq!(open(&blob2, PW, &params()).unwrap(), b"second persist");
}

#[test]
fn open_with_derived_key() {
    let blob = seal(b"payload", PW, &params()).unwrap();
    let salt = read_salt(&blob).unwrap();
    let key = derive_key(PW, &salt, &params()).unwrap();
    assert_eq!(open_with(&key, &blob).unwrap(), b"payload");
}

#[test]
fn fresh_salt_per_seal() {
    let a = seal(b"payload", PW, &params()).unwrap();
    let b = seal(b"payload", PW, &params()).unwrap();
    assert_ne!(read_salt(&a).unwrap(), read_salt(&b).unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn roundtrip_arbitrary_payloads(payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let blob = seal(&payload, PW, &params()).unwrap();
        let recovered = open(&blob, PW, &params()).unwrap();
        prop_assert_eq!(recovered, payload);
    }

    #[test]
    fn wrong_password_never_succeeds(pw in "[a-z]{1,12}") {
        prop_assume!(pw != PW);
        let blob = seal(b"payload", PW, &params()).unwrap();
        prop_assert!(open(&blob, &pw, &params()).is_err());
    }
}
