use thiserror::Error as ThisError;

/// Failure reported by a capability handler.
///
/// The protocol layer never interprets it: the message travels back to the
/// caller unchanged inside a `DelegationError` frame.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
