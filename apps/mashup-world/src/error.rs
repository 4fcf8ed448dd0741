use mashup_core::error::{ConfigError, IpcError, TlsError};

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error;

/// Errors that stop the world mashup from starting.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Error from this app (logging, directories)
    #[error("World Error: {message} {location}")]
    World {
        message: String,
        location: ErrorLocation,
    },

    /// Error from mashup-core (configuration, TLS, server)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ConfigError> for WorldError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        WorldError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<TlsError> for WorldError {
    #[track_caller]
    fn from(error: TlsError) -> Self {
        WorldError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IpcError> for WorldError {
    #[track_caller]
    fn from(error: IpcError) -> Self {
        WorldError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
