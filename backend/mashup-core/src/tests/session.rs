use crate::error::SessionError;
use crate::proto::MashupConnectionConfigs;
use crate::session::{ConnectionConfig, ConnectionStore, SessionState, StoreCommand};

fn handshake() -> ConnectionConfig {
    ConnectionConfig::new("H1", "127.0.0.1", 4000)
}

fn establish(session_token: &str, peer_port: u16) -> StoreCommand {
    StoreCommand::Establish {
        session: ConnectionConfig::new(session_token, "127.0.0.1", 4000),
        peer: ConnectionConfig::new("caller", "127.0.0.1", peer_port),
    }
}

/// **VALUE**: A fresh store has no session.
///
/// **WHY THIS MATTERS**: Delegated calls are authorized against the session credential;
/// before a handshake there must be nothing to match.
///
/// **BUG THIS CATCHES**: Would catch if the handshake credential doubled as the initial
/// session credential.
#[tokio::test]
async fn given_new_store_when_queried_then_unestablished() {
    // GIVEN: A new store
    let store = ConnectionStore::new(handshake());

    // WHEN/THEN: No session, no peer, nothing matches
    assert_eq!(store.state().await, SessionState::Unestablished);
    assert!(store.session_config().await.is_none());
    assert!(store.peer_config().await.is_none());
    assert!(!store.session_token_matches("H1").await);
    assert!(!store.session_token_matches("").await);
}

/// **VALUE**: An acknowledged update is immediately visible.
///
/// **WHY THIS MATTERS**: The handshake returns the session credential right after the
/// update; the host may use it on the very next call.
///
/// **BUG THIS CATCHES**: Would catch the read-after-write race where `update` returned
/// before the actor applied the command.
#[tokio::test]
async fn given_establish_command_when_update_returns_then_session_is_visible() {
    // GIVEN: A new store
    let store = ConnectionStore::new(handshake());

    // WHEN: Establishing a session
    store
        .update(establish("S1", 5000))
        .await
        .expect("Update should succeed");

    // THEN: Session and peer are both visible
    assert_eq!(store.state().await, SessionState::Established);
    assert!(store.session_token_matches("S1").await);
    assert!(!store.session_token_matches("H1").await);
    assert_eq!(store.peer_config().await.map(|peer| peer.port), Some(5000));
}

/// **VALUE**: A second handshake replaces the first (last writer wins).
///
/// **BUG THIS CATCHES**: Would catch if the old session credential stayed valid after a
/// re-handshake.
#[tokio::test]
async fn given_established_store_when_established_again_then_old_session_is_replaced() {
    // GIVEN: An established session S1
    let store = ConnectionStore::new(handshake());
    store.update(establish("S1", 5000)).await.expect("first");

    // WHEN: Establishing S2 from a different peer
    store.update(establish("S2", 6000)).await.expect("second");

    // THEN: Only S2 is valid and the peer is the new one
    assert!(!store.session_token_matches("S1").await);
    assert!(store.session_token_matches("S2").await);
    assert_eq!(store.peer_config().await.map(|peer| peer.port), Some(6000));
}

/// **VALUE**: Clones share state.
///
/// **BUG THIS CATCHES**: Would catch if a component held a clone that never saw updates.
#[tokio::test]
async fn given_cloned_store_when_original_updated_then_clone_sees_session() {
    // GIVEN: A store and a clone
    let store = ConnectionStore::new(handshake());
    let clone = store.clone();

    // WHEN: Updating through the original
    store.update(establish("S1", 5000)).await.expect("update");

    // THEN: The clone sees it
    assert!(clone.session_token_matches("S1").await);
}

/// **VALUE**: Bootstrap comparison is exact.
#[test]
fn given_handshake_token_when_compared_then_only_exact_match_passes() {
    // GIVEN: A store with bootstrap H1
    let store = ConnectionStore::new(handshake());

    // WHEN/THEN: Only "H1" matches
    assert!(store.handshake_token_matches("H1"));
    assert!(!store.handshake_token_matches("h1"));
    assert!(!store.handshake_token_matches("H1 "));
    assert!(!store.handshake_token_matches(""));
}

/// **VALUE**: The peer credential is the caller token, not the bootstrap token.
///
/// **WHY THIS MATTERS**: The caller token is what the host expects on calls coming back
/// from the mashup.
///
/// **BUG THIS CATCHES**: Would catch if the bootstrap credential were echoed back to the
/// host on the reverse channel.
#[test]
fn given_handshake_request_when_peer_built_then_uses_caller_token() {
    // GIVEN: A request with distinct bootstrap and caller tokens
    let request = MashupConnectionConfigs {
        auth_token: "H1".to_string(),
        caller_token: "C1".to_string(),
        server: "localhost".to_string(),
        port: 7000,
    };

    // WHEN: Building the peer config
    let peer = ConnectionConfig::peer_from_request(&request).expect("Valid request");

    // THEN: Caller token, advertised address
    assert!(peer.auth_token.matches("C1"));
    assert_eq!(peer.authority(), "localhost:7000");
}

/// **VALUE**: An unusable advertised address is a transport failure.
///
/// **BUG THIS CATCHES**: Would catch a negative or oversized port being truncated into a
/// valid-looking one.
#[test]
fn given_invalid_port_or_server_when_peer_built_then_returns_transport_error() {
    // GIVEN: Requests with bad ports and an empty server
    let base = MashupConnectionConfigs {
        auth_token: "H1".to_string(),
        caller_token: "C1".to_string(),
        server: "localhost".to_string(),
        port: 7000,
    };
    let bad = [
        MashupConnectionConfigs { port: 0, ..base.clone() },
        MashupConnectionConfigs { port: -1, ..base.clone() },
        MashupConnectionConfigs { port: 70_000, ..base.clone() },
        MashupConnectionConfigs { server: String::new(), ..base },
    ];

    for request in bad {
        // WHEN: Building the peer config
        let result = ConnectionConfig::peer_from_request(&request);

        // THEN: Transport error
        assert!(
            matches!(result, Err(SessionError::Transport { .. })),
            "Expected Transport for port {} server {:?}",
            request.port,
            request.server
        );
    }
}

/// **VALUE**: IPv6 literals are bracketed in authorities.
#[test]
fn given_ipv6_server_when_authority_built_then_brackets_address() {
    // GIVEN: An IPv6 loopback peer
    let config = ConnectionConfig::new("t", "::1", 9000);

    // WHEN/THEN: Bracketed authority
    assert_eq!(config.authority(), "[::1]:9000");
}
