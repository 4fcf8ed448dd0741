use crate::world::{DisplaySurface, WorldApiHandler};

use mashup_core::proto::{MashupDisplayHint, MashupElementStateBundle};
use mashup_core::{MashupApiHandler, MashupContext};

fn hint(width: i64, height: i64) -> MashupDisplayHint {
    MashupDisplayHint {
        xpos: 0,
        ypos: 0,
        width,
        height,
        focused: true,
    }
}

/// **VALUE**: The first display change creates the main window, later ones resize it.
///
/// **WHY THIS MATTERS**: The host drives the mashup's window entirely through
/// OnDisplayChange; initializing twice would open a second window.
///
/// **BUG THIS CATCHES**: Would catch the surface staying uninitialized, or later hints
/// being ignored.
#[test]
fn given_uninitialized_surface_when_display_changes_then_initializes_then_resizes() {
    // GIVEN: A fresh handler
    let handler = WorldApiHandler::new();
    assert_eq!(handler.surface(), DisplaySurface::Uninitialized);

    // WHEN: Two display changes
    handler.on_display_change(&hint(800, 600));
    let after_first = handler.surface();
    handler.on_display_change(&hint(1024, 768));

    // THEN: Initialized at the first size, then resized
    assert_eq!(
        after_first,
        DisplaySurface::Ready {
            width: 800,
            height: 600
        }
    );
    assert_eq!(
        handler.surface(),
        DisplaySurface::Ready {
            width: 1024,
            height: 768
        }
    );
}

/// **VALUE**: World reports its unimplemented capabilities as errors.
///
/// **BUG THIS CATCHES**: Would catch the handler silently succeeding, which would make the
/// host believe state changes were applied.
#[test]
fn given_world_handler_when_tweaking_states_then_returns_error() {
    // GIVEN: A handler
    let handler = WorldApiHandler::new();

    // WHEN: Tweaking states and reading elements
    let tweak = handler.tweak_states(MashupElementStateBundle::default());
    let elements = handler.get_elements();

    // THEN: Both fail with the world's messages
    assert_eq!(
        tweak.expect_err("must fail").message(),
        "Could not capture items."
    );
    assert_eq!(
        elements.expect_err("must fail").message(),
        "Could not get items."
    );
}

/// **VALUE**: The handler keeps the context it is given at handshake time.
#[test]
fn given_handler_when_context_registered_then_context_is_kept() {
    // GIVEN: A handler without context
    let handler = WorldApiHandler::new();
    assert!(!handler.has_context());

    // WHEN: Registering a context
    handler.register_context(&MashupContext::new());

    // THEN: Kept
    assert!(handler.has_context());
}
