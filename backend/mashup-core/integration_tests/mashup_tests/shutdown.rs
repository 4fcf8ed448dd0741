use crate::mashup_tests::helpers::{TEST_BOOTSTRAP_TOKEN, established, handshake_request};

use mashup_core::lifecycle::PEER_SHUTDOWN_EXIT_CODE;
use mashup_core::proto::MashupErrorCode;

use std::time::{Duration, Instant};

/// **VALUE**: Shutdown(S1) acks, then terminates within 100–500 ms with the
/// peer-shutdown status.
///
/// **WHY THIS MATTERS**: The host must receive the acknowledgement before the mashup goes
/// away, and must be able to tell a requested shutdown from a crash.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Terminating before the ack is sent
/// - Never terminating
/// - A clean exit status
/// - The reverse channel being left open
#[tokio::test]
async fn given_session_when_shutdown_then_acks_and_terminates_within_window() {
    // GIVEN: An established session
    let (host, mashup, client, session) = established(|builder| builder).await;

    // WHEN: Shutdown(S1)
    let called_at = Instant::now();
    let ack = client.shutdown(&session).await;

    // THEN: Ack arrives
    assert!(ack.is_ok(), "Shutdown should be acknowledged: {ack:?}");
    assert!(mashup.service.lifecycle().is_shutdown_requested());

    // THEN: One termination, with the peer status, inside the window
    tokio::time::sleep(Duration::from_millis(500)).await;
    let calls = mashup.hook.calls();
    assert_eq!(calls.len(), 1, "Hook should fire exactly once");
    let (code, at) = calls[0];
    assert_eq!(code, PEER_SHUTDOWN_EXIT_CODE);
    let elapsed = at.duration_since(called_at);
    assert!(
        elapsed >= Duration::from_millis(100) && elapsed <= Duration::from_millis(500),
        "Terminated after {elapsed:?}"
    );

    // THEN: The reverse channel is gone
    assert!(!mashup.service.context().is_connected().await);
    assert_eq!(host.disconnections(), 1);
}

/// **VALUE**: Shutdown with the bootstrap credential is rejected and schedules nothing.
#[tokio::test]
async fn given_bootstrap_credential_when_shutdown_then_auth_error_and_no_termination() {
    // GIVEN: An established session
    let (_host, mashup, client, _session) = established(|builder| builder).await;

    // WHEN: Shutdown(H1)
    let err = client
        .shutdown(TEST_BOOTSTRAP_TOKEN)
        .await
        .expect_err("Shutdown(H1) must fail");

    // THEN: Auth error and no termination
    assert_eq!(err.remote_code(), Some(MashupErrorCode::AuthError));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(mashup.hook.calls().is_empty());
}

/// **VALUE**: The reverse channel presents the caller credential to the host.
///
/// **WHY THIS MATTERS**: The host authorizes calls from the mashup with the credential it
/// handed over at handshake time.
///
/// **BUG THIS CATCHES**: Would catch the mashup presenting its bootstrap or session
/// credential on the reverse channel.
#[tokio::test]
async fn given_session_when_notifying_peer_then_host_sees_caller_token() {
    // GIVEN: An established session
    let (host, mashup, _client, _session) = established(|builder| builder).await;

    // WHEN: Notifying the host of shutdown
    mashup
        .service
        .context()
        .notify_peer_shutdown(Duration::from_secs(2))
        .await
        .expect("Host should ack");

    // THEN: The host saw the caller token
    assert_eq!(
        host.shutdown_tokens(),
        vec![crate::mashup_tests::helpers::TEST_CALLER_TOKEN.to_string()]
    );
}

/// **VALUE**: Stopping the server closes client connections.
///
/// **BUG THIS CATCHES**: Would catch connections outliving the server.
#[tokio::test]
async fn given_running_server_when_stopped_then_client_calls_fail() {
    // GIVEN: An established session
    let (_host, mashup, client, session) = established(|builder| builder).await;

    // WHEN: Stopping the server
    mashup.handle.stop();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // THEN: Calls on the old connection fail
    assert!(client.get_elements(&session).await.is_err());
}

/// **VALUE**: A handshake arriving after a shutdown request does not bind a new reverse
/// channel.
///
/// **WHY THIS MATTERS**: Teardown closes the link once; a link installed afterwards would
/// stay open until the process exits.
///
/// **BUG THIS CATCHES**: Would catch a late handshake re-opening the channel that shutdown
/// just closed.
#[tokio::test]
async fn given_shutdown_requested_when_collaborate_init_then_rejected_and_no_link() {
    // GIVEN: A session that has been told to shut down and has torn down its link
    let (host, mashup, client, session) = established(|builder| builder).await;
    client.shutdown(&session).await.expect("Shutdown should be acknowledged");
    tokio::time::sleep(Duration::from_millis(300)).await;

    // WHEN: Handshaking again
    let err = client
        .collaborate_init(handshake_request(TEST_BOOTSTRAP_TOKEN, host.port))
        .await
        .expect_err("Handshake during shutdown must fail");

    // THEN: Rejected, and no reverse channel is left behind
    assert_eq!(err.remote_code(), Some(MashupErrorCode::InternalError));
    assert!(!mashup.service.context().is_connected().await);
}
