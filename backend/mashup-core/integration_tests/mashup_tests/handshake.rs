use crate::mashup_tests::helpers::{
    TEST_BOOTSTRAP_TOKEN, established, generate_certs, handshake_request, mashup_builder,
    start_test_host, start_test_mashup,
};

use mashup_core::proto::{MashupElementState, MashupElementStateBundle, MashupErrorCode};
use mashup_core::session::{ConnectionConfig, SessionState};
use mashup_core::tls::{CertificateMaterial, ServerIdentity, build_client_config};
use mashup_core::{MashupPeerClient, MashupService, start_mashup_server};

use std::time::Duration;

fn states(auth_token: &str) -> MashupElementStateBundle {
    MashupElementStateBundle {
        auth_token: auth_token.to_string(),
        element_states: vec![MashupElementState { id: 2, state: 1 }],
    }
}

/// **VALUE**: The full H1 → S1 exchange works end to end.
///
/// **WHY THIS MATTERS**: This is the protocol: a host that knows the bootstrap credential
/// gets a fresh session credential, which then (and only then) authorizes delegated calls.
///
/// **BUG THIS CATCHES**: Would catch:
/// - The session credential echoing the bootstrap credential
/// - The bootstrap credential still authorizing delegated calls
/// - The reverse channel not being opened during the handshake
/// - The completion notification never firing
#[tokio::test]
async fn given_bootstrap_h1_when_collaborate_init_then_session_s1_authorizes_calls() {
    // GIVEN: A host and a mashup holding bootstrap H1, after a handshake
    let (host, mashup, client, session_token) = established(|builder| builder).await;

    // THEN: S1 is fresh
    assert!(!session_token.is_empty(), "Session credential must be set");
    assert_ne!(session_token, TEST_BOOTSTRAP_TOKEN);

    // THEN: The reverse channel was opened and the handshake signalled
    assert_eq!(host.connections(), 1, "Mashup should have dialed the host");
    tokio::time::timeout(Duration::from_secs(1), mashup.service.wait_for_handshake())
        .await
        .expect("Handshake completion should be signalled");
    assert_eq!(
        mashup.service.store().state().await,
        SessionState::Established
    );

    // WHEN: TweakStates with S1
    let ok = client.tweak_states(states(&session_token)).await;

    // THEN: Succeeds
    assert!(ok.is_ok(), "TweakStates(S1) should succeed: {ok:?}");

    // WHEN: TweakStates with H1
    let rejected = client.tweak_states(states(TEST_BOOTSTRAP_TOKEN)).await;

    // THEN: Auth error
    let err = rejected.expect_err("TweakStates(H1) must fail");
    assert_eq!(err.remote_code(), Some(MashupErrorCode::AuthError));
}

/// **VALUE**: The session config reports where the mashup actually listens.
///
/// **BUG THIS CATCHES**: Would catch an ephemeral bind (port 0) leaking into the session
/// config as port 0.
#[tokio::test]
async fn given_ephemeral_bind_when_handshake_completes_then_session_reports_bound_port() {
    // GIVEN: A mashup bound to port 0
    let certs = generate_certs();
    let host = start_test_host(&certs).await;
    let mashup = start_test_mashup(mashup_builder(Some(&certs.cert_pem))).await;
    let client = mashup.connect().await;

    // WHEN: Handshaking
    let session = client
        .collaborate_init(handshake_request(TEST_BOOTSTRAP_TOKEN, host.port))
        .await
        .expect("Handshake should succeed");

    // THEN: The real port comes back
    assert_eq!(session.port, i64::from(mashup.handle.port()));
    assert_eq!(session.server, "127.0.0.1");
}

/// **VALUE**: A wrong bootstrap credential is rejected over the wire and changes nothing.
///
/// **BUG THIS CATCHES**: Would catch the peer being dialed or recorded before the
/// credential check.
#[tokio::test]
async fn given_wrong_bootstrap_when_collaborate_init_then_auth_error_and_no_reverse_channel() {
    // GIVEN: A host and a mashup
    let certs = generate_certs();
    let host = start_test_host(&certs).await;
    let mashup = start_test_mashup(mashup_builder(Some(&certs.cert_pem))).await;
    let client = mashup.connect().await;

    // WHEN: Handshaking with the wrong credential
    let result = client
        .collaborate_init(handshake_request("not-H1", host.port))
        .await;

    // THEN: Auth error; no state, no reverse channel
    let err = result.expect_err("Handshake must fail");
    assert_eq!(err.remote_code(), Some(MashupErrorCode::AuthError));
    assert_eq!(
        mashup.service.store().state().await,
        SessionState::Unestablished
    );
    assert!(mashup.service.store().peer_config().await.is_none());
    assert_eq!(host.connections(), 0);
}

/// **VALUE**: A missing certificate surfaces as a configuration error on the wire.
///
/// **WHY THIS MATTERS**: The host has to tell "cert missing" from "bad credential".
#[tokio::test]
async fn given_no_certificate_when_collaborate_init_then_configuration_error() {
    // GIVEN: A mashup without certificate material
    let certs = generate_certs();
    let host = start_test_host(&certs).await;
    let mashup = start_test_mashup(mashup_builder(None)).await;
    let client = mashup.connect().await;

    // WHEN: Handshaking with the right credential
    let result = client
        .collaborate_init(handshake_request(TEST_BOOTSTRAP_TOKEN, host.port))
        .await;

    // THEN: Configuration error
    let err = result.expect_err("Handshake must fail");
    assert_eq!(err.remote_code(), Some(MashupErrorCode::ConfigurationError));
    assert_eq!(host.connections(), 0);
}

/// **VALUE**: The reverse channel only trusts the configured certificate, unless insecure
/// mode is explicitly enabled.
///
/// **WHY THIS MATTERS**: Skipping verification is a deliberate test/dev toggle; without it
/// an impostor host must not get a session.
///
/// **BUG THIS CATCHES**: Would catch verification being skipped by default, or the insecure
/// toggle being ignored.
#[tokio::test]
async fn given_untrusted_host_when_collaborate_init_then_fails_unless_insecure() {
    // GIVEN: A host whose certificate differs from the mashup's trust anchor
    let host_certs = generate_certs();
    let other_certs = generate_certs();
    let host = start_test_host(&host_certs).await;

    let strict = start_test_mashup(mashup_builder(Some(&other_certs.cert_pem))).await;
    let insecure = start_test_mashup(
        mashup_builder(Some(&other_certs.cert_pem)).with_insecure_skip_verify(true),
    )
    .await;

    // WHEN: Handshaking with both
    let strict_result = strict
        .connect()
        .await
        .collaborate_init(handshake_request(TEST_BOOTSTRAP_TOKEN, host.port))
        .await;
    let insecure_result = insecure
        .connect()
        .await
        .collaborate_init(handshake_request(TEST_BOOTSTRAP_TOKEN, host.port))
        .await;

    // THEN: Strict fails with a transport error and stores nothing; insecure succeeds
    let err = strict_result.expect_err("Strict handshake must fail");
    assert_eq!(err.remote_code(), Some(MashupErrorCode::TransportError));
    assert_eq!(
        strict.service.store().state().await,
        SessionState::Unestablished
    );
    assert!(insecure_result.is_ok(), "Insecure handshake: {insecure_result:?}");
}

/// **VALUE**: A re-handshake replaces the session credential.
///
/// **BUG THIS CATCHES**: Would catch the previous session credential remaining valid after
/// the host re-handshakes.
#[tokio::test]
async fn given_established_session_when_handshaking_again_then_old_credential_is_revoked() {
    // GIVEN: An established session S1
    let (host, _mashup, client, first) = established(|builder| builder).await;

    // WHEN: Handshaking again
    let second = client
        .collaborate_init(handshake_request(TEST_BOOTSTRAP_TOKEN, host.port))
        .await
        .expect("Second handshake should succeed")
        .auth_token;

    // THEN: New credential works, old one does not
    assert_ne!(first, second);
    assert!(client.tweak_states(states(&second)).await.is_ok());
    let err = client
        .tweak_states(states(&first))
        .await
        .expect_err("Old credential must be rejected");
    assert_eq!(err.remote_code(), Some(MashupErrorCode::AuthError));
}

/// **VALUE**: The mashup can serve its own endpoint over TLS.
///
/// **BUG THIS CATCHES**: Would catch the server identity not being applied to accepted
/// connections.
#[tokio::test]
async fn given_server_identity_when_client_connects_over_tls_then_handshake_succeeds() {
    // GIVEN: A host, and a mashup served over TLS with its own certificate
    let host_certs = generate_certs();
    let host = start_test_host(&host_certs).await;

    let mashup_certs = generate_certs();
    let identity = ServerIdentity::from_pem(
        mashup_certs.cert_pem.as_bytes(),
        mashup_certs.key_pem.as_bytes(),
    )
    .expect("Server identity");
    let service: MashupService = mashup_builder(Some(&host_certs.cert_pem))
        .build()
        .expect("build");
    let handle = start_mashup_server("127.0.0.1:0", Some(identity), service)
        .await
        .expect("Failed to start TLS mashup server");

    // WHEN: Connecting over TLS, trusting the mashup's certificate, and handshaking
    let anchor = CertificateMaterial::from_pem(mashup_certs.cert_pem.as_bytes()).expect("anchor");
    let tls = build_client_config(&anchor, false).expect("client config");
    let client = MashupPeerClient::connect_tls(
        &ConnectionConfig::new("", "localhost", handle.port()),
        tls,
        Duration::from_secs(5),
        4 * 1024 * 1024,
    )
    .await
    .expect("TLS connect should succeed");
    let session = client
        .collaborate_init(handshake_request(TEST_BOOTSTRAP_TOKEN, host.port))
        .await;

    // THEN: The handshake completes
    assert!(session.is_ok(), "Handshake over TLS failed: {session:?}");
    handle.stop();
}

/// **VALUE**: Concurrent handshakes from two hosts leave the store and the reverse channel
/// bound to the same host.
///
/// **WHY THIS MATTERS**: Shutdown notification goes over the reverse channel with the caller
/// credential of the recorded peer. If the link belongs to one host while the store records
/// the other, the wrong host is told to shut down.
///
/// **BUG THIS CATCHES**: Would catch the store update and the link swap interleaving between
/// two handshakes (A-store, B-store, B-link, A-link).
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_two_hosts_when_handshaking_concurrently_then_store_and_link_agree() {
    // GIVEN: Two hosts trusting the same certificate and one mashup
    let certs = generate_certs();
    let host_a = start_test_host(&certs).await;
    let host_b = start_test_host(&certs).await;
    let mashup = start_test_mashup(mashup_builder(Some(&certs.cert_pem))).await;
    let service = &mashup.service;

    for round in 0..50 {
        // WHEN: Both hosts handshake at once
        let (a, b) = tokio::join!(
            service.collaborate_init(handshake_request(TEST_BOOTSTRAP_TOKEN, host_a.port)),
            service.collaborate_init(handshake_request(TEST_BOOTSTRAP_TOKEN, host_b.port)),
        );
        a.expect("Handshake A should succeed");
        b.expect("Handshake B should succeed");

        // THEN: The recorded peer is the one the link points at
        let stored = service.store().peer_config().await.expect("stored peer");
        let linked = service.context().peer_config().await.expect("linked peer");
        assert_eq!(
            stored.port, linked.port,
            "Round {round}: store and reverse channel point at different hosts"
        );
    }
}
