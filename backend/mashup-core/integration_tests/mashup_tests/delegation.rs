use crate::mashup_tests::helpers::{CountingHandler, FailingHandler, established, fixed_elements};

use mashup_core::MashupPeerClient;
use mashup_core::proto::{
    MashupDetailedElementBundle, MashupDisplayBundle, MashupDisplayHint, MashupElementState,
    MashupElementStateBundle, MashupErrorCode, MashupRequest, MashupResponse, Motiv,
    mashup_response,
};

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use prost::Message as ProstMessage;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

fn display_bundle(auth_token: &str) -> MashupDisplayBundle {
    MashupDisplayBundle {
        auth_token: auth_token.to_string(),
        display_hint: Some(MashupDisplayHint {
            xpos: 0,
            ypos: 0,
            width: 1024,
            height: 768,
            focused: true,
        }),
    }
}

/// **VALUE**: With no handler bound, delegated calls succeed with empty data.
///
/// **WHY THIS MATTERS**: Partial deployments rely on the soft no-op; the host must not see
/// errors for capabilities the mashup does not implement.
///
/// **BUG THIS CATCHES**: Would catch unbound calls returning errors or a missing hint echo.
#[tokio::test]
async fn given_no_handler_when_calling_operations_then_empty_results_without_error() {
    // GIVEN: An established session and no handler
    let (_host, _mashup, client, session) = established(|builder| builder).await;

    // WHEN: GetElements and OnDisplayChange
    let elements = client.get_elements(&session).await;
    let hint = client.on_display_change(display_bundle(&session)).await;

    // THEN: Empty bundle and echoed hint
    assert_eq!(
        elements.expect("GetElements should succeed"),
        MashupDetailedElementBundle::default()
    );
    assert_eq!(
        hint.expect("OnDisplayChange should succeed"),
        display_bundle("").display_hint.unwrap_or_default()
    );
}

/// **VALUE**: GetElements is idempotent when the handler is.
///
/// **BUG THIS CATCHES**: Would catch the protocol layer mutating handler results (e.g.
/// stamping credentials into the bundle).
#[tokio::test]
async fn given_handler_when_get_elements_twice_then_results_are_identical() {
    // GIVEN: A counting handler
    let handler = Arc::new(CountingHandler::default());
    let bound = handler.clone();
    let (_host, _mashup, client, session) =
        established(move |builder| builder.with_handler(bound)).await;

    // WHEN: Calling GetElements twice
    let first = client.get_elements(&session).await.expect("first");
    let second = client.get_elements(&session).await.expect("second");

    // THEN: Identical, and the handler's data
    assert_eq!(first, second);
    assert_eq!(first, fixed_elements());
    assert_eq!(handler.calls(), 2);
}

/// **VALUE**: Rejected calls never reach the handler.
///
/// **BUG THIS CATCHES**: Would catch dispatch running before (or without) authorization.
#[tokio::test]
async fn given_wrong_credential_when_calling_then_handler_is_not_invoked() {
    // GIVEN: A counting handler and an established session
    let handler = Arc::new(CountingHandler::default());
    let bound = handler.clone();
    let (_host, _mashup, client, _session) =
        established(move |builder| builder.with_handler(bound)).await;

    // WHEN: Calling every delegated operation with a wrong credential
    let results = [
        client.get_elements("wrong").await.map(|_| ()),
        client
            .upsert_elements(MashupDetailedElementBundle {
                auth_token: "wrong".to_string(),
                ..fixed_elements()
            })
            .await
            .map(|_| ()),
        client
            .tweak_states(MashupElementStateBundle {
                auth_token: "wrong".to_string(),
                element_states: vec![MashupElementState { id: 1, state: 1 }],
            })
            .await
            .map(|_| ()),
        client
            .tweak_states_by_motiv(Motiv {
                auth_token: "wrong".to_string(),
                code: 1,
                ..Default::default()
            })
            .await,
        client
            .on_display_change(display_bundle("wrong"))
            .await
            .map(|_| ()),
    ];

    // THEN: Auth errors, handler untouched
    for result in results {
        let err = result.expect_err("Call must be rejected");
        assert_eq!(err.remote_code(), Some(MashupErrorCode::AuthError));
    }
    assert_eq!(handler.calls(), 0);
}

/// **VALUE**: Handler errors reach the host verbatim as delegation errors.
#[tokio::test]
async fn given_failing_handler_when_calling_then_delegation_error_carries_message() {
    // GIVEN: A failing handler
    let (_host, _mashup, client, session) =
        established(|builder| builder.with_handler(Arc::new(FailingHandler))).await;

    // WHEN: GetElements
    let err = client
        .get_elements(&session)
        .await
        .expect_err("Handler failure must propagate");

    // THEN: DelegationError with the handler's message
    assert_eq!(err.remote_code(), Some(MashupErrorCode::DelegationError));
    assert!(
        err.to_string().contains("Could not get items."),
        "Unexpected error: {err}"
    );
}

/// **VALUE**: Concurrent calls on one connection are correlated by request id.
///
/// **WHY THIS MATTERS**: Requests are served on separate tasks and may complete out of
/// order.
///
/// **BUG THIS CATCHES**: Would catch responses being delivered to the wrong caller.
#[tokio::test]
async fn given_concurrent_calls_when_served_then_each_caller_gets_its_response() {
    // GIVEN: A counting handler and one shared client
    let handler = Arc::new(CountingHandler::default());
    let bound = handler.clone();
    let (_host, _mashup, client, session) =
        established(move |builder| builder.with_handler(bound)).await;

    // WHEN: Twenty calls in flight at once
    let mut tasks = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        let session = session.clone();
        tasks.push(tokio::spawn(async move {
            let mut bundle = display_bundle(&session);
            if let Some(hint) = bundle.display_hint.as_mut() {
                hint.width = i;
            }
            client.on_display_change(bundle).await
        }));
    }

    // THEN: Every caller sees its own hint echoed
    for (i, task) in tasks.into_iter().enumerate() {
        let hint = task.await.expect("join").expect("call");
        assert_eq!(hint.width, i as i64);
    }
    assert_eq!(handler.calls(), 20);
}

/// **VALUE**: Undecodable frames get an InvalidMessage reply instead of killing the
/// connection.
#[tokio::test]
async fn given_garbage_frame_when_sent_then_invalid_message_response() {
    // GIVEN: A raw WebSocket connection to the mashup
    let (_host, mashup, _client, _session) = established(|builder| builder).await;
    let (mut ws, _) = connect_async(mashup.url()).await.expect("connect");

    // WHEN: Sending bytes that are not a request
    ws.send(Message::Binary(vec![0xff, 0xff, 0xff].into()))
        .await
        .expect("send");

    // THEN: An InvalidMessage error frame comes back
    let frame = ws.next().await.expect("frame").expect("read");
    let response = MashupResponse::decode(&frame.into_data()[..]).expect("decode");
    match response.payload {
        Some(mashup_response::Payload::Error(err)) => {
            assert_eq!(err.code, MashupErrorCode::InvalidMessage as i32);
        }
        other => panic!("Expected error frame, got {other:?}"),
    }

    // THEN: The connection still serves requests
    let empty = MashupRequest {
        request_id: 9,
        payload: None,
    };
    ws.send(Message::Binary(empty.encode_to_vec().into()))
        .await
        .expect("send");
    let frame = ws.next().await.expect("frame").expect("read");
    let response = MashupResponse::decode(&frame.into_data()[..]).expect("decode");
    assert_eq!(response.request_id, 9);
}

/// **VALUE**: A plain WebSocket client enforces its own message size limit.
///
/// **WHY THIS MATTERS**: The TLS reverse channel and plain clients share one frame policy;
/// a plain client must not accept responses larger than it was configured for.
///
/// **BUG THIS CATCHES**: Would catch `connect` falling back to the library's default limits.
#[tokio::test]
async fn given_small_client_limit_when_response_exceeds_it_then_call_fails() {
    // GIVEN: An echoing handler and a second client limited to 1 KiB
    let handler = Arc::new(CountingHandler::default());
    let bound = handler.clone();
    let (_host, mashup, _client, session) =
        established(move |builder| builder.with_handler(bound)).await;
    let small = MashupPeerClient::connect(&mashup.url(), 1024)
        .await
        .expect("connect");

    // WHEN: Upserting a bundle the handler echoes back at ~4 KiB
    let mut bundle = fixed_elements();
    bundle.auth_token = session.clone();
    bundle.detailed_elements[0].description = "x".repeat(4096);
    let result = small.upsert_elements(bundle).await;

    // THEN: The oversized reply is refused after the handler ran
    assert!(result.is_err(), "Oversized response must be rejected");
    assert_eq!(handler.calls(), 1);
}
