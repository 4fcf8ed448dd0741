use crate::error::tls::TlsError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;

use log::{debug, warn};
use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use rustls::pki_types::pem::PemObject;

/// A single trust anchor parsed from one PEM certificate block.
#[derive(Debug, Clone)]
pub struct CertificateMaterial {
    anchor: CertificateDer<'static>,
}

impl CertificateMaterial {
    /// Parse PEM bytes into a trust anchor.
    ///
    /// The first `CERTIFICATE` block is used; further blocks are ignored with
    /// a warning. The certificate must be accepted by a [`RootCertStore`],
    /// so a block that decodes but is not a valid X.509 certificate fails
    /// here rather than at connect time.
    ///
    /// # Errors
    ///
    /// - [`TlsError::Missing`] if `pem` is empty
    /// - [`TlsError::Parse`] if no certificate block decodes or the
    ///   certificate cannot serve as a trust anchor
    #[track_caller]
    pub fn from_pem(pem: &[u8]) -> Result<Self, TlsError> {
        if pem.iter().all(u8::is_ascii_whitespace) {
            return Err(TlsError::Missing {
                message: String::from("Certificate PEM input is empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut blocks = CertificateDer::pem_slice_iter(pem);

        let anchor = match blocks.next() {
            Some(Ok(cert)) => cert,
            Some(Err(e)) => {
                return Err(TlsError::Parse {
                    message: format!("Failed to decode PEM certificate: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            None => {
                return Err(TlsError::Parse {
                    message: String::from("No CERTIFICATE block found in PEM input"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let extra = blocks.count();
        if extra > 0 {
            warn!("Ignoring {extra} additional PEM block(s) after the trust anchor");
        }

        let material = Self { anchor };
        material.root_store()?;

        debug!(
            "Loaded trust anchor certificate ({} DER bytes)",
            material.anchor.len()
        );
        Ok(material)
    }

    /// Read and parse a PEM file.
    ///
    /// # Errors
    ///
    /// [`TlsError::Read`] if the file cannot be read, otherwise as
    /// [`CertificateMaterial::from_pem`].
    #[track_caller]
    pub fn from_pem_file(path: &Path) -> Result<Self, TlsError> {
        let location = ErrorLocation::from(Location::caller());
        let bytes = std::fs::read(path).map_err(|e| TlsError::Read {
            location,
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_pem(&bytes)
    }

    /// DER encoding of the trust anchor.
    pub fn certificate(&self) -> &CertificateDer<'static> {
        &self.anchor
    }

    /// Root store containing only this anchor.
    #[track_caller]
    pub fn root_store(&self) -> Result<RootCertStore, TlsError> {
        let mut store = RootCertStore::empty();
        store
            .add(self.anchor.clone())
            .map_err(|e| TlsError::Parse {
                message: format!("Certificate is not a usable trust anchor: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;
        Ok(store)
    }
}
