//! Startup configuration for a mashup process.
//!
//! Values come from an optional TOML file, then from the environment (after
//! loading `.env`), and are validated last.

use crate::error::config::ConfigError;
use crate::error::tls::TlsError;
use crate::handshake::CertificateSlot;
use crate::tls::{CertificateMaterial, ServerIdentity};

use common::{ErrorLocation, RedactedToken};

use std::panic::Location;
use std::path::{Path, PathBuf};

use const_format::concatcp;
use log::{debug, info, warn};
use serde::Deserialize;

const ENV_PREFIX: &str = "MASHUP_";

pub const ENV_CREDS: &str = concatcp!(ENV_PREFIX, "CREDS");
pub const ENV_PORT: &str = concatcp!(ENV_PREFIX, "PORT");
pub const ENV_TLS_SKIP_VALIDATION: &str = concatcp!(ENV_PREFIX, "TLS_SKIP_VALIDATION");
pub const ENV_CERT_PATH: &str = concatcp!(ENV_PREFIX, "CERT_PATH");
pub const ENV_KEY_PATH: &str = concatcp!(ENV_PREFIX, "KEY_PATH");

pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

// ============================================
// CONFIG STRUCT
// ============================================

/// Everything a mashup needs to start serving.
///
/// Deserialize-only: the handshake token refuses to serialize.
#[derive(Debug, Clone, Deserialize)]
pub struct MashupConfig {
    /// Bootstrap credential shared with the host.
    #[serde(default)]
    pub handshake_token: RedactedToken,

    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// 0 lets the OS pick.
    #[serde(default)]
    pub port: u16,

    /// Skip verifying the host's identity on the reverse channel.
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// PEM certificate trusted for the reverse channel.
    #[serde(default)]
    pub cert_path: Option<PathBuf>,

    /// Private key for `cert_path`; when set the mashup serves over TLS.
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for MashupConfig {
    fn default() -> Self {
        Self {
            handshake_token: RedactedToken::default(),
            bind_host: default_bind_host(),
            port: 0,
            insecure_skip_verify: false,
            cert_path: None,
            key_path: None,
            max_message_size: default_max_message_size(),
        }
    }
}

fn default_bind_host() -> String {
    DEFAULT_BIND_HOST.to_string()
}
fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

// ============================================
// IMPLEMENTATION
// ============================================

impl MashupConfig {
    /// File (if given), then `.env` and the process environment, then
    /// validation.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from loading, overriding or validating.
    pub fn resolve(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {e}");
        }

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Unreadable`] or [`ConfigError::Malformed`] if the file
    /// exists but cannot be used.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: MashupConfig = toml::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config TOML: {}", e);
            ConfigError::Malformed {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Override fields from `MASHUP_*` environment variables.
    ///
    /// # Errors
    ///
    /// [`ConfigError::BadEnv`] if a variable is set but unparseable.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(creds) = env_value(ENV_CREDS) {
            self.handshake_token = RedactedToken::new(creds);
        }

        if let Some(port) = env_value(ENV_PORT) {
            self.port = port.parse().map_err(|e| ConfigError::BadEnv {
                location: ErrorLocation::from(Location::caller()),
                variable: ENV_PORT.to_string(),
                reason: format!("{port:?} is not a valid port: {e}"),
            })?;
        }

        if let Some(skip) = env_value(ENV_TLS_SKIP_VALIDATION) {
            self.insecure_skip_verify = parse_bool(&skip).ok_or_else(|| ConfigError::BadEnv {
                location: ErrorLocation::from(Location::caller()),
                variable: ENV_TLS_SKIP_VALIDATION.to_string(),
                reason: format!("{skip:?} is not a boolean"),
            })?;
        }

        if let Some(cert) = env_value(ENV_CERT_PATH) {
            self.cert_path = Some(PathBuf::from(cert));
        }

        if let Some(key) = env_value(ENV_KEY_PATH) {
            self.key_path = Some(PathBuf::from(key));
        }

        Ok(())
    }

    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if any value is unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handshake_token.is_empty() {
            return Err(ConfigError::Invalid {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Handshake token is empty (set {ENV_CREDS})"),
            });
        }

        if self.bind_host.is_empty() {
            return Err(ConfigError::Invalid {
                location: ErrorLocation::from(Location::caller()),
                reason: "bind_host cannot be empty".to_string(),
            });
        }

        if self.max_message_size == 0 {
            return Err(ConfigError::Invalid {
                location: ErrorLocation::from(Location::caller()),
                reason: "max_message_size must be greater than 0".to_string(),
            });
        }

        if self.key_path.is_some() && self.cert_path.is_none() {
            return Err(ConfigError::Invalid {
                location: ErrorLocation::from(Location::caller()),
                reason: "key_path is set but cert_path is not".to_string(),
            });
        }

        Ok(())
    }

    /// `host:port` to bind, bracketing IPv6 literals.
    pub fn bind_address(&self) -> String {
        if self.bind_host.contains(':') && !self.bind_host.starts_with('[') {
            format!("[{}]:{}", self.bind_host, self.port)
        } else {
            format!("{}:{}", self.bind_host, self.port)
        }
    }

    /// Trust anchor from `cert_path`.
    ///
    /// Never fails: an unusable file is kept as
    /// [`CertificateSlot::Invalid`] so the handshake can report it.
    pub fn certificate_slot(&self) -> CertificateSlot {
        let Some(path) = &self.cert_path else {
            warn!("No certificate configured (set {ENV_CERT_PATH})");
            return CertificateSlot::Missing;
        };

        match CertificateMaterial::from_pem_file(path) {
            Ok(material) => CertificateSlot::Loaded(material),
            Err(TlsError::Missing { .. }) => CertificateSlot::Missing,
            Err(e) => {
                warn!("Certificate at {} rejected: {e}", path.display());
                CertificateSlot::Invalid(e.to_string())
            }
        }
    }

    /// TLS identity for serving, when both cert and key are configured.
    ///
    /// # Errors
    ///
    /// [`TlsError`] if the files cannot be read or parsed.
    pub fn server_identity(&self) -> Result<Option<ServerIdentity>, TlsError> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => ServerIdentity::from_pem_files(cert, key).map(Some),
            _ => Ok(None),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
