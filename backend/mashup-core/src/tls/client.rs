use crate::error::tls::TlsError;
use crate::tls::certificate::CertificateMaterial;
use crate::tls::crypto_provider;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;

use log::warn;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};

/// Build the client config for the reverse channel.
///
/// Trusts only `material`. With `insecure_skip_verify` the peer's certificate
/// chain and name are not checked (handshake signatures still are); this is
/// meant for local testing against certificates that do not name the host.
#[track_caller]
pub fn build_client_config(
    material: &CertificateMaterial,
    insecure_skip_verify: bool,
) -> Result<Arc<ClientConfig>, TlsError> {
    let location = ErrorLocation::from(Location::caller());
    let provider = crypto_provider();

    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Config {
            message: format!("Unsupported protocol versions: {e}"),
            location,
        })?;

    let config = if insecure_skip_verify {
        warn!("TLS peer verification disabled (insecure mode)");
        builder
            .dangerous()
            .with_custom_certificate_verifier(SkipServerVerification::new(provider))
            .with_no_client_auth()
    } else {
        builder
            .with_root_certificates(material.root_store()?)
            .with_no_client_auth()
    };

    Ok(Arc::new(config))
}

/// Verifier that accepts any server certificate.
///
/// Handshake signatures are still verified against the presented
/// certificate, so the session keys are bound to whoever holds its key.
#[derive(Debug)]
pub struct SkipServerVerification {
    provider: Arc<CryptoProvider>,
}

impl SkipServerVerification {
    pub fn new(provider: Arc<CryptoProvider>) -> Arc<Self> {
        Arc::new(Self { provider })
    }
}

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
