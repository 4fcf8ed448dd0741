use crate::dispatch::DelegationDispatcher;
use crate::error::SessionError;
use crate::proto::{
    MashupDetailedElementBundle, MashupDisplayHint, MashupEmpty, Motiv,
};
use crate::tests::support::{CountingHandler, sample_bundle};

use std::sync::Arc;

fn hint() -> MashupDisplayHint {
    MashupDisplayHint {
        xpos: 10,
        ypos: 20,
        width: 800,
        height: 600,
        focused: true,
    }
}

/// **VALUE**: Unbound dispatch is a soft no-op.
///
/// **WHY THIS MATTERS**: A mashup may ship without a handler; the host must still get
/// well-formed, empty answers.
///
/// **BUG THIS CATCHES**: Would catch unbound calls returning an error or panicking.
#[test]
fn given_no_handler_when_dispatching_then_returns_empty_results() {
    // GIVEN: No handler bound
    let dispatcher = DelegationDispatcher::new(None);

    // WHEN: Dispatching every operation
    let elements = dispatcher.get_elements().expect("GetElements");
    let upserted = dispatcher
        .upsert_elements(sample_bundle())
        .expect("UpsertElements");
    let motiv = dispatcher
        .tweak_states_by_motiv(Motiv::default())
        .expect("TweakStatesByMotiv");

    // THEN: Empty data, no errors
    assert_eq!(elements, MashupDetailedElementBundle::default());
    assert_eq!(upserted, MashupDetailedElementBundle::default());
    assert_eq!(motiv, MashupEmpty::default());
    assert!(!dispatcher.is_bound());
}

/// **VALUE**: The display hint is echoed whether or not a handler is bound.
///
/// **BUG THIS CATCHES**: Would catch the response carrying a default hint instead of the
/// received one.
#[test]
fn given_display_hint_when_dispatched_then_hint_is_echoed() {
    // GIVEN: A bound and an unbound dispatcher
    let handler = Arc::new(CountingHandler::default());
    let bound = DelegationDispatcher::new(Some(handler.clone()));
    let unbound = DelegationDispatcher::new(None);

    // WHEN: Dispatching the same hint
    let from_bound = bound.on_display_change(hint());
    let from_unbound = unbound.on_display_change(hint());

    // THEN: Both echo it; only the bound handler saw it
    assert_eq!(from_bound, hint());
    assert_eq!(from_unbound, hint());
    assert_eq!(handler.calls(), 1);
}

/// **VALUE**: Bound dispatch returns the handler's result verbatim.
#[test]
fn given_handler_when_getting_elements_then_returns_handler_bundle() {
    // GIVEN: A counting handler
    let handler = Arc::new(CountingHandler::default());
    let dispatcher = DelegationDispatcher::new(Some(handler.clone()));

    // WHEN: Getting elements
    let bundle = dispatcher.get_elements().expect("GetElements");

    // THEN: Handler bundle, one call
    assert_eq!(bundle, sample_bundle());
    assert_eq!(handler.calls(), 1);
}

/// **VALUE**: Handler errors become delegation errors with the message unchanged.
///
/// **WHY THIS MATTERS**: The protocol layer must not interpret or rewrite application
/// errors.
///
/// **BUG THIS CATCHES**: Would catch handler failures being swallowed, retried, or mapped
/// to a different error class.
#[test]
fn given_failing_handler_when_dispatching_then_returns_delegation_error_verbatim() {
    // GIVEN: A handler that always fails
    let handler = Arc::new(CountingHandler::failing("Could not capture items."));
    let dispatcher = DelegationDispatcher::new(Some(handler.clone()));

    // WHEN: Tweaking states
    let result = dispatcher.tweak_states(Default::default());

    // THEN: Delegation error carrying the handler's message
    match result {
        Err(err @ SessionError::Delegation { .. }) => {
            assert_eq!(err.message(), "Could not capture items.");
        }
        other => panic!("Expected Delegation error, got {other:?}"),
    }
    assert_eq!(handler.calls(), 1, "Handler must be called exactly once");
}
