use common::ErrorLocation;

use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Certificate material could not be turned into a usable trust anchor.
#[derive(Debug, ThisError)]
pub enum TlsError {
    #[error("Certificate Missing Error: {message} {location}")]
    Missing {
        message: String,
        location: ErrorLocation,
    },

    #[error("Certificate Read Error: {path}: {source} {location}")]
    Read {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Certificate Parse Error: {message} {location}")]
    Parse {
        message: String,
        location: ErrorLocation,
    },

    #[error("TLS Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },
}
