use crate::error::handler::HandlerError;
use crate::error::tls::TlsError;
use crate::proto::MashupErrorCode;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures of the collaboration protocol itself.
///
/// Each variant maps to exactly one [`MashupErrorCode`] on the wire so a
/// caller can tell a bad credential from a missing certificate from an
/// unreachable peer.
#[derive(Debug, ThisError)]
pub enum SessionError {
    /// Presented credential does not match the expected one.
    #[error("Auth Error: {message} {location}")]
    Auth {
        message: String,
        location: ErrorLocation,
    },

    /// Certificate material is missing or unusable.
    #[error("Configuration Error: {message} {location}")]
    Configuration {
        message: String,
        location: ErrorLocation,
    },

    /// The reverse channel to the peer could not be opened.
    #[error("Transport Error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
    },

    /// The capability handler returned an error.
    #[error("Delegation Error: {message} {location}")]
    Delegation {
        message: String,
        location: ErrorLocation,
    },

    /// Internal state could not be read or updated.
    #[error("State Error: {message} {location}")]
    State {
        message: String,
        location: ErrorLocation,
    },
}

impl SessionError {
    #[track_caller]
    pub(crate) fn auth(message: impl Into<String>) -> Self {
        SessionError::Auth {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        SessionError::Transport {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn state(message: impl Into<String>) -> Self {
        SessionError::State {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Wire code for this failure.
    pub fn code(&self) -> MashupErrorCode {
        match self {
            SessionError::Auth { .. } => MashupErrorCode::AuthError,
            SessionError::Configuration { .. } => MashupErrorCode::ConfigurationError,
            SessionError::Transport { .. } => MashupErrorCode::TransportError,
            SessionError::Delegation { .. } => MashupErrorCode::DelegationError,
            SessionError::State { .. } => MashupErrorCode::InternalError,
        }
    }

    /// Message sent to the caller (without the location suffix).
    pub fn message(&self) -> &str {
        match self {
            SessionError::Auth { message, .. }
            | SessionError::Configuration { message, .. }
            | SessionError::Transport { message, .. }
            | SessionError::Delegation { message, .. }
            | SessionError::State { message, .. } => message,
        }
    }
}

impl From<TlsError> for SessionError {
    #[track_caller]
    fn from(error: TlsError) -> Self {
        SessionError::Configuration {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<HandlerError> for SessionError {
    #[track_caller]
    fn from(error: HandlerError) -> Self {
        SessionError::Delegation {
            message: error.message().to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
