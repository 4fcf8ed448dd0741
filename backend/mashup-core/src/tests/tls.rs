use crate::error::tls::TlsError;
use crate::tests::support::self_signed_pem;
use crate::tls::{CertificateMaterial, ServerIdentity, build_client_config};

use std::path::Path;

/// **VALUE**: Empty certificate input is reported as missing, not malformed.
///
/// **WHY THIS MATTERS**: The handshake distinguishes "no certificate configured" from
/// "certificate configured but broken" when reporting a configuration failure.
///
/// **BUG THIS CATCHES**: Would catch if empty or whitespace-only input fell through to the
/// PEM parser and surfaced as a parse error.
#[test]
fn given_empty_pem_when_parsed_then_returns_missing() {
    // GIVEN: Whitespace-only input
    let pem = b"  \n\t\n";

    // WHEN: Parsing it
    let result = CertificateMaterial::from_pem(pem);

    // THEN: Missing
    assert!(
        matches!(result, Err(TlsError::Missing { .. })),
        "Expected Missing, got {result:?}"
    );
}

/// **VALUE**: Input without a certificate block is rejected.
///
/// **WHY THIS MATTERS**: A trust anchor that silently parsed to nothing would make every
/// handshake fail later with a confusing TLS error.
///
/// **BUG THIS CATCHES**: Would catch if non-PEM text were accepted as certificate material.
#[test]
fn given_text_without_certificate_block_when_parsed_then_returns_parse_error() {
    // GIVEN: Text that is not PEM
    let pem = b"this is not a certificate";

    // WHEN: Parsing it
    let result = CertificateMaterial::from_pem(pem);

    // THEN: Parse error
    assert!(
        matches!(result, Err(TlsError::Parse { .. })),
        "Expected Parse, got {result:?}"
    );
}

/// **VALUE**: A valid self-signed certificate becomes a single trust anchor.
///
/// **WHY THIS MATTERS**: This is the material the reverse channel trusts; it must load
/// into a root store exactly once.
///
/// **BUG THIS CATCHES**: Would catch if a valid certificate were rejected or added twice.
#[test]
fn given_valid_certificate_when_parsed_then_root_store_has_one_anchor() {
    // GIVEN: A freshly generated certificate
    let (cert_pem, _) = self_signed_pem();

    // WHEN: Parsing it and building a root store
    let material = CertificateMaterial::from_pem(cert_pem.as_bytes())
        .expect("Valid certificate should parse");
    let store = material.root_store().expect("Root store should build");

    // THEN: Exactly one anchor
    assert_eq!(store.len(), 1);
}

/// **VALUE**: With several blocks, the first is the trust anchor.
///
/// **WHY THIS MATTERS**: Operators sometimes point at a bundle file. The anchor must be
/// predictable.
///
/// **BUG THIS CATCHES**: Would catch if a later block replaced the first one.
#[test]
fn given_two_certificates_when_parsed_then_first_is_used() {
    // GIVEN: Two different certificates concatenated
    let (first, _) = self_signed_pem();
    let (second, _) = self_signed_pem();
    let bundle = format!("{first}{second}");

    // WHEN: Parsing the bundle
    let material =
        CertificateMaterial::from_pem(bundle.as_bytes()).expect("Bundle should parse");
    let expected =
        CertificateMaterial::from_pem(first.as_bytes()).expect("First should parse");

    // THEN: The anchor is the first certificate
    assert_eq!(material.certificate(), expected.certificate());
}

/// **VALUE**: An unreadable certificate file is a read error carrying the path.
///
/// **BUG THIS CATCHES**: Would catch if a missing file were reported as empty input.
#[test]
fn given_missing_file_when_loaded_then_returns_read_error() {
    // GIVEN: A path that does not exist
    let path = Path::new("/definitely/not/here/cert.pem");

    // WHEN: Loading it
    let result = CertificateMaterial::from_pem_file(path);

    // THEN: Read error
    assert!(
        matches!(result, Err(TlsError::Read { .. })),
        "Expected Read, got {result:?}"
    );
}

/// **VALUE**: Client configs build in both verifying and insecure mode.
///
/// **WHY THIS MATTERS**: The insecure toggle must only change verification, not break
/// config construction.
///
/// **BUG THIS CATCHES**: Would catch provider/protocol-version mismatches in either path.
#[test]
fn given_certificate_when_building_client_config_then_both_modes_succeed() {
    // GIVEN: Loaded material
    let (cert_pem, _) = self_signed_pem();
    let material = CertificateMaterial::from_pem(cert_pem.as_bytes()).expect("parse");

    // WHEN: Building verifying and insecure configs
    let verifying = build_client_config(&material, false);
    let insecure = build_client_config(&material, true);

    // THEN: Both succeed
    assert!(verifying.is_ok(), "Verifying config failed: {verifying:?}");
    assert!(insecure.is_ok(), "Insecure config failed: {insecure:?}");
}

/// **VALUE**: A server identity needs a matching, parseable key.
///
/// **BUG THIS CATCHES**: Would catch if a garbage key were accepted and only failed at the
/// first TLS accept.
#[test]
fn given_garbage_key_when_building_server_identity_then_returns_error() {
    // GIVEN: A valid certificate with an invalid key
    let (cert_pem, key_pem) = self_signed_pem();

    // WHEN: Building identities with the real and a garbage key
    let good = ServerIdentity::from_pem(cert_pem.as_bytes(), key_pem.as_bytes());
    let bad = ServerIdentity::from_pem(cert_pem.as_bytes(), b"not a key");

    // THEN: Only the real key works
    assert!(good.is_ok(), "Real key should be accepted");
    assert!(bad.is_err(), "Garbage key should be rejected");
}
