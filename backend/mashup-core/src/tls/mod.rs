//! Certificate material and TLS configuration.
//!
//! The mashup trusts exactly one certificate: the PEM block handed to it at
//! startup. That certificate is the trust anchor for the reverse channel the
//! handshake opens back to the host. Optionally the same module builds the
//! server-side config when the mashup serves its own endpoint over TLS.

mod certificate;
mod client;
mod server;

pub use certificate::CertificateMaterial;
pub use client::{SkipServerVerification, build_client_config};
pub use server::ServerIdentity;

use std::sync::Arc;

use rustls::crypto::CryptoProvider;

/// Crypto provider used for every TLS config in this crate.
///
/// Passed explicitly so the process-wide default provider never matters.
pub(crate) fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}
