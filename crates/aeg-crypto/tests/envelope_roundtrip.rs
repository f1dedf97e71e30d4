//! End-to-end tests for the public seal / open / inspect API.
//!
//! Verifies round trips, that tampering never yields altered plaintext,
//! and that malformed containers are rejected before key derivation.

use aeg_crypto::{
    decode, inspect_only, open_file, seal_file, EnvelopeError, FormatError, SealOptions,
    MIN_ITERATIONS,
};
use proptest::prelude::*;
use secrecy::SecretString;

const PASSWORD: &str = "correct-horse-battery";

fn pw(s: &str) -> SecretString {
    SecretString::from(s)
}

fn seal_hello(filename: &str, iterations: u32) -> Vec<u8> {
    let opts = SealOptions::new(iterations).filename(filename);
    seal_file(b"hello".to_vec(), &pw(PASSWORD), &opts).expect("seal should succeed")
}

#[test]
fn hello_scenario() {
    let filename = "hello.txt";
    let sealed = seal_hello(filename, 100_000);

    assert_eq!(sealed.len(), 25 + 16 + 12 + filename.len() + 5 + 16);

    let opened = open_file(&sealed, &pw(PASSWORD)).unwrap();
    assert_eq!(opened.as_slice(), b"hello");

    let err = open_file(&sealed, &pw("wrong")).unwrap_err();
    assert!(matches!(err, EnvelopeError::Authentication));
}

#[test]
fn each_seal_uses_fresh_salt_and_nonce() {
    let a = seal_hello("same.txt", MIN_ITERATIONS);
    let b = seal_hello("same.txt", MIN_ITERATIONS);

    let (ea, eb) = (decode(&a).unwrap(), decode(&b).unwrap());
    assert_ne!(ea.salt, eb.salt);
    assert_ne!(ea.nonce, eb.nonce);
    assert_ne!(ea.ciphertext, eb.ciphertext);
}

#[test]
fn empty_plaintext_roundtrip() {
    let sealed = seal_file(Vec::new(), &pw(PASSWORD), &SealOptions::new(MIN_ITERATIONS)).unwrap();
    assert_eq!(inspect_only(&sealed).unwrap().plaintext_size, 0);
    assert!(open_file(&sealed, &pw(PASSWORD)).unwrap().is_empty());
}

#[test]
fn unicode_password_compositions_interchangeable() {
    let opts = SealOptions::new(MIN_ITERATIONS);
    let sealed = seal_file(b"data".to_vec(), &pw("p\u{00e4}ssw\u{00f6}rd"), &opts).unwrap();
    let opened = open_file(&sealed, &pw("pa\u{0308}sswo\u{0308}rd")).unwrap();
    assert_eq!(opened.as_slice(), b"data");
}

#[test]
fn tampering_body_and_authenticated_header_fields_fails_authentication() {
    let sealed = seal_hello("hello.txt", MIN_ITERATIONS);
    let env = decode(&sealed).unwrap();
    let salt_start = 25;
    let body_start = env.header.len();

    // low bit of the iteration count keeps it in range
    let mut positions = vec![14];
    // every byte of salt, nonce, filename, ciphertext and tag
    positions.extend(salt_start..body_start);
    positions.extend(body_start..sealed.len());

    for pos in positions {
        let mut bad = sealed.clone();
        bad[pos] ^= 0x01;
        match open_file(&bad, &pw(PASSWORD)) {
            Err(EnvelopeError::Authentication) => {}
            other => panic!("byte {pos}: expected authentication failure, got {other:?}"),
        }
    }
}

#[test]
fn tampering_validated_header_fields_fails_format() {
    let sealed = seal_hello("hello.txt", MIN_ITERATIONS);

    // magic, version, salt_len, nonce_len, tag_bits, plaintext_size, filename_len
    for pos in [0, 6, 7, 8, 9, 10, 22, 24] {
        for bit in 0..8 {
            let mut bad = sealed.clone();
            bad[pos] ^= 1 << bit;
            let err = open_file(&bad, &pw(PASSWORD)).unwrap_err();
            assert!(
                err.is_format(),
                "byte {pos} bit {bit}: expected format error, got {err:?}"
            );
        }
    }
}

#[test]
fn no_single_bit_flip_ever_opens() {
    let opts = SealOptions::new(MIN_ITERATIONS).filename("a");
    let sealed = seal_file(b"z".to_vec(), &pw(PASSWORD), &opts).unwrap();

    for pos in 0..sealed.len() {
        for bit in 0..8 {
            let mut bad = sealed.clone();
            bad[pos] ^= 1 << bit;
            if let Ok(opened) = open_file(&bad, &pw(PASSWORD)) {
                panic!("byte {pos} bit {bit}: opened to {:?}", opened.as_slice());
            }
        }
    }
}

#[test]
fn embedded_iterations_out_of_range_rejected_without_derivation() {
    let mut sealed = seal_hello("x", MIN_ITERATIONS);
    sealed[11..15].copy_from_slice(&6_000_000u32.to_be_bytes());

    let expected = FormatError::IterationsOutOfRange {
        got: 6_000_000,
        min: 50_000,
        max: 5_000_000,
    };
    match inspect_only(&sealed) {
        Err(EnvelopeError::Format(e)) => assert_eq!(e, expected),
        other => panic!("unexpected: {other:?}"),
    }
    match open_file(&sealed, &pw(PASSWORD)) {
        Err(EnvelopeError::Format(e)) => assert_eq!(e, expected),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn truncated_container_is_format_error() {
    let sealed = seal_hello("hello.txt", MIN_ITERATIONS);
    for len in [0, 10, 24, 25, 40, sealed.len() - 1] {
        let err = open_file(&sealed[..len], &pw(PASSWORD)).unwrap_err();
        assert!(err.is_format(), "length {len}: {err:?}");
    }
}

#[test]
fn trailing_garbage_is_format_error() {
    let mut sealed = seal_hello("hello.txt", MIN_ITERATIONS);
    sealed.push(0);
    assert!(matches!(
        inspect_only(&sealed),
        Err(EnvelopeError::Format(FormatError::CiphertextLength { .. }))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn seal_open_roundtrip(
        plaintext in proptest::collection::vec(any::<u8>(), 0..2048),
        password in "\\PC{1,32}",
        hide in any::<bool>(),
    ) {
        let opts = SealOptions::new(MIN_ITERATIONS).filename("payload.bin").hide_name(hide);
        let sealed = seal_file(plaintext.clone(), &pw(&password), &opts).unwrap();

        let meta = inspect_only(&sealed).unwrap();
        prop_assert_eq!(meta.plaintext_size, plaintext.len() as u64);
        prop_assert_eq!(meta.is_hidden(), hide);

        let opened = open_file(&sealed, &pw(&password)).unwrap();
        prop_assert_eq!(opened.as_slice(), plaintext.as_slice());
    }
}
