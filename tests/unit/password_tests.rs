use sample_app_backend::auth::{build_hasher, Argon2Hasher, CredentialHasher, ScryptHasher};
use sample_app_backend::config::{HasherKind, PasswordSettings};

fn check_hasher(hasher: &dyn CredentialHasher, prefix: &str) {
    let digest = hasher.hash("foobar").unwrap();

    assert!(digest.starts_with(prefix), "unexpected digest format: {digest}");
    assert_ne!(digest, "foobar");
    assert!(hasher.verify("foobar", &digest));
    assert!(!hasher.verify("foobaz", &digest));

    // salted: same input, different digest
    assert_ne!(digest, hasher.hash("foobar").unwrap());
}

#[test]
fn test_scrypt_hash_and_verify() {
    check_hasher(&ScryptHasher::new(10, 8, 1).unwrap(), "$scrypt$");
}

#[test]
fn test_argon2_hash_and_verify() {
    check_hasher(&Argon2Hasher::new(64, 1, 1).unwrap(), "$argon2id$");
}

#[test]
fn test_malformed_digest_never_matches() {
    let hasher = ScryptHasher::new(10, 8, 1).unwrap();
    assert!(!hasher.verify("foobar", ""));
    assert!(!hasher.verify("foobar", "not-a-phc-string"));
}

#[test]
fn test_build_hasher_from_settings() {
    let mut settings = PasswordSettings::default();
    settings.scrypt_log_n = 10;
    let hasher = build_hasher(&settings).unwrap();
    assert!(hasher.hash("foobar").unwrap().starts_with("$scrypt$"));

    settings.hasher = HasherKind::Argon2;
    settings.argon2_m_cost = 64;
    settings.argon2_t_cost = 1;
    let hasher = build_hasher(&settings).unwrap();
    assert!(hasher.hash("foobar").unwrap().starts_with("$argon2id$"));
}

#[test]
fn test_digests_verify_across_instances() {
    let digest = ScryptHasher::new(10, 8, 1).unwrap().hash("foobar").unwrap();
    // parameters travel with the digest
    let other = ScryptHasher::new(11, 8, 1).unwrap();
    assert!(other.verify("foobar", &digest));
}
