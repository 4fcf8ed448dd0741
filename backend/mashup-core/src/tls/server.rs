use crate::error::tls::TlsError;
use crate::tls::crypto_provider;

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;

/// Certificate chain and key the mashup serves its own endpoint with.
pub struct ServerIdentity {
    config: Arc<ServerConfig>,
}

impl ServerIdentity {
    /// Build from PEM-encoded certificate chain and private key.
    #[track_caller]
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, TlsError> {
        let location = ErrorLocation::from(Location::caller());

        let chain = CertificateDer::pem_slice_iter(cert_pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::Parse {
                message: format!("Failed to parse server certificate chain: {e}"),
                location,
            })?;
        if chain.is_empty() {
            return Err(TlsError::Missing {
                message: String::from("Server certificate chain is empty"),
                location,
            });
        }

        let key = PrivateKeyDer::from_pem_slice(key_pem).map_err(|e| TlsError::Parse {
            message: format!("Failed to parse server private key: {e}"),
            location,
        })?;

        let config = ServerConfig::builder_with_provider(crypto_provider())
            .with_safe_default_protocol_versions()
            .map_err(|e| TlsError::Config {
                message: format!("Unsupported protocol versions: {e}"),
                location,
            })?
            .with_no_client_auth()
            .with_single_cert(chain, key)
            .map_err(|e| TlsError::Config {
                message: format!("Invalid server certificate/key pair: {e}"),
                location,
            })?;

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Read both PEM files and build the identity.
    #[track_caller]
    pub fn from_pem_files(cert_path: &Path, key_path: &Path) -> Result<Self, TlsError> {
        let location = ErrorLocation::from(Location::caller());
        let read = |path: &Path| {
            std::fs::read(path).map_err(|e| TlsError::Read {
                location,
                path: path.to_path_buf(),
                source: e,
            })
        };

        let cert_pem = read(cert_path)?;
        let key_pem = read(key_path)?;
        Self::from_pem(&cert_pem, &key_pem)
    }

    pub(crate) fn acceptor(&self) -> TlsAcceptor {
        TlsAcceptor::from(Arc::clone(&self.config))
    }
}
