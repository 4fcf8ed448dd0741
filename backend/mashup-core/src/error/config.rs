use common::ErrorLocation;

use std::path::PathBuf;

use thiserror::Error;

/// Why a mashup could not assemble its [`MashupConfig`](crate::config::MashupConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("Mashup config {path} unreadable: {source} {location}")]
    Unreadable {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for a mashup.
    #[error("Mashup config {path} malformed: {reason} {location}")]
    Malformed {
        location: ErrorLocation,
        path: PathBuf,
        reason: String,
    },

    /// A `MASHUP_*` variable is set but unusable.
    #[error("Environment variable {variable} rejected: {reason} {location}")]
    BadEnv {
        location: ErrorLocation,
        variable: String,
        reason: String,
    },

    /// The resolved settings cannot start a mashup (no bootstrap credential,
    /// zero frame size, key without certificate).
    #[error("Mashup config rejected: {reason} {location}")]
    Invalid {
        location: ErrorLocation,
        reason: String,
    },
}
