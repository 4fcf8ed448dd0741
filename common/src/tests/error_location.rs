use crate::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line and column.
///
/// **WHY THIS MATTERS**: Every error in the workspace carries an `ErrorLocation`.
/// If capture breaks, all error messages lose the pointer back to the failing code.
///
/// **BUG THIS CATCHES**: Would catch if `Location::caller()` stops being
/// propagated or the line/column fields are swapped.
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN/WHEN: An ErrorLocation built from the current location
    let expected_line = line!() + 1;
    let location = ErrorLocation::from(Location::caller());

    // THEN: File, line and column are populated
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert_eq!(location.line, expected_line, "Should capture correct line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies the Display format used in every error message.
///
/// **WHY THIS MATTERS**: Error strings end in `[file:line:column]`; log
/// scrapers and humans both rely on that shape.
///
/// **BUG THIS CATCHES**: Would catch a format change (missing brackets or colons).
#[test]
fn given_error_location_when_displayed_then_uses_bracketed_format() {
    // GIVEN: A fixed location
    let location = ErrorLocation {
        file: "src/handshake.rs",
        line: 42,
        column: 7,
    };

    // WHEN: Formatting it
    let rendered = location.to_string();

    // THEN: Should be [file:line:column]
    assert_eq!(rendered, "[src/handshake.rs:42:7]");
}

/// **VALUE**: Verifies `ErrorLocation::here()` reports the tracked caller.
///
/// **WHY THIS MATTERS**: Helpers marked `#[track_caller]` use `here()` to
/// attribute errors to their call sites.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` is dropped from `here()`,
/// which would make every location point into `error_location.rs` of the
/// common crate instead of this test file.
#[test]
fn given_here_when_called_then_points_at_call_site() {
    // WHEN: Capturing via here()
    let location = ErrorLocation::here();

    // THEN: Should point at this test file
    assert!(location.file.contains("tests"), "Should point at the caller");
}
