use crate::proto::MashupErrorCode;

use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;
use tokio_tungstenite::tungstenite::Error as WsError;

#[derive(Debug, ThisError)]
pub enum IpcError {
    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    #[error("Protobuf Decode Error: {message} {location}")]
    ProtobufDecode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Protobuf Encode Error: {message} {location}")]
    ProtobufEncode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Connection Closed: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    /// The peer answered with an error frame.
    #[error("Remote Error ({code:?}): {message} {location}")]
    Remote {
        code: MashupErrorCode,
        message: String,
        location: ErrorLocation,
    },
}

impl IpcError {
    /// Error code of a [`IpcError::Remote`] reply, if this is one.
    pub fn remote_code(&self) -> Option<MashupErrorCode> {
        match self {
            IpcError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<IoError> for IpcError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        IpcError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<prost::DecodeError> for IpcError {
    #[track_caller]
    fn from(error: prost::DecodeError) -> Self {
        IpcError::ProtobufDecode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<prost::EncodeError> for IpcError {
    #[track_caller]
    fn from(error: prost::EncodeError) -> Self {
        IpcError::ProtobufEncode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<WsError> for IpcError {
    #[track_caller]
    fn from(error: WsError) -> Self {
        match error {
            WsError::ConnectionClosed | WsError::AlreadyClosed => IpcError::Closed {
                message: error.to_string(),
                location: ErrorLocation::from(Location::caller()),
            },
            other => IpcError::Read {
                message: other.to_string(),
                location: ErrorLocation::from(Location::caller()),
            },
        }
    }
}
