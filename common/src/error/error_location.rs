//! Source location attached to every error variant in the workspace.

use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location as PanicLocation;

/// File, line and column where an error was raised.
///
/// Built from [`PanicLocation::caller`] inside `#[track_caller]` functions so
/// the location points at the code that produced the error, not at the
/// conversion helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorLocation {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl ErrorLocation {
    pub const fn from(location: &'static PanicLocation<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }

    /// Location of the (tracked) caller.
    #[track_caller]
    pub fn here() -> Self {
        Self::from(PanicLocation::caller())
    }
}

impl Display for ErrorLocation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "[{}:{}:{}]", self.file, self.line, self.column)
    }
}
