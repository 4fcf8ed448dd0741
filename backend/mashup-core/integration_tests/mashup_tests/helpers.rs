//! Test helpers for mashup integration tests.
//!
//! This module provides:
//! - Self-signed certificates for `localhost`
//! - A TLS "host" that accepts the mashup's reverse channel and acks
//!   `Shutdown` calls
//! - A mashup server wired with a recording shutdown hook
//! - Test doubles for the capability handler

use mashup_core::error::HandlerError;
use mashup_core::handshake::CertificateSlot;
use mashup_core::proto::{
    MashupConnectionConfigs, MashupDetailedElement, MashupDetailedElementBundle,
    MashupDisplayHint, MashupElementStateBundle, MashupEmpty, MashupErrorCode,
    MashupErrorResponse, MashupRequest, MashupResponse, Motiv, mashup_request, mashup_response,
};
use mashup_core::session::ConnectionConfig;
use mashup_core::{
    MashupApiHandler, MashupPeerClient, MashupServerHandle, MashupService, MashupServiceBuilder,
    ShutdownHook, start_mashup_server,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use prost::Message as ProstMessage;
use rustls::ServerConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Bootstrap credential every test mashup is started with.
pub const TEST_BOOTSTRAP_TOKEN: &str = "H1";

/// Credential the test host expects back on the reverse channel.
pub const TEST_CALLER_TOKEN: &str = "caller-token-777";

pub struct TestCerts {
    pub cert_pem: String,
    pub key_pem: String,
}

/// Test helper: generate a self-signed certificate for localhost.
pub fn generate_certs() -> TestCerts {
    let certified = rcgen::generate_simple_self_signed(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
    ])
    .expect("Failed to generate certificate");

    TestCerts {
        cert_pem: certified.cert.pem(),
        key_pem: certified.key_pair.serialize_pem(),
    }
}

// ============================================
// TEST HOST
// ============================================

/// The host end of the reverse channel.
pub struct TestHost {
    pub port: u16,
    connections: Arc<AtomicUsize>,
    disconnections: Arc<AtomicUsize>,
    shutdown_tokens: Arc<Mutex<Vec<String>>>,
}

impl TestHost {
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn disconnections(&self) -> usize {
        self.disconnections.load(Ordering::SeqCst)
    }

    pub fn shutdown_tokens(&self) -> Vec<String> {
        self.shutdown_tokens
            .lock()
            .expect("host mutex poisoned")
            .clone()
    }
}

/// Test helper: start a TLS WebSocket host on an ephemeral port.
pub async fn start_test_host(certs: &TestCerts) -> TestHost {
    let chain = vec![
        CertificateDer::from_pem_slice(certs.cert_pem.as_bytes()).expect("Failed to parse cert"),
    ];
    let key = PrivateKeyDer::from_pem_slice(certs.key_pem.as_bytes()).expect("Failed to parse key");
    let config = ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .expect("Failed to set protocol versions")
    .with_no_client_auth()
    .with_single_cert(chain, key)
    .expect("Failed to build server config");
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test host");
    let port = listener.local_addr().expect("No local addr").port();

    let connections = Arc::new(AtomicUsize::new(0));
    let disconnections = Arc::new(AtomicUsize::new(0));
    let shutdown_tokens = Arc::new(Mutex::new(Vec::new()));

    let host = TestHost {
        port,
        connections: Arc::clone(&connections),
        disconnections: Arc::clone(&disconnections),
        shutdown_tokens: Arc::clone(&shutdown_tokens),
    };

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let connections = Arc::clone(&connections);
            let disconnections = Arc::clone(&disconnections);
            let shutdown_tokens = Arc::clone(&shutdown_tokens);

            tokio::spawn(async move {
                let Ok(tls) = acceptor.accept(stream).await else {
                    return;
                };
                let Ok(mut ws) = accept_async(tls).await else {
                    return;
                };
                connections.fetch_add(1, Ordering::SeqCst);

                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Binary(data) = msg else {
                        continue;
                    };
                    let Ok(request) = MashupRequest::decode(&data[..]) else {
                        continue;
                    };

                    let payload = match request.payload {
                        Some(mashup_request::Payload::Shutdown(empty)) => {
                            shutdown_tokens
                                .lock()
                                .expect("host mutex poisoned")
                                .push(empty.auth_token);
                            mashup_response::Payload::Empty(MashupEmpty::default())
                        }
                        _ => mashup_response::Payload::Error(MashupErrorResponse {
                            code: MashupErrorCode::InvalidMessage as i32,
                            message: "Test host only handles Shutdown".to_string(),
                        }),
                    };

                    let response = MashupResponse {
                        request_id: request.request_id,
                        payload: Some(payload),
                    };
                    if ws
                        .send(Message::Binary(response.encode_to_vec().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }

                disconnections.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    host
}

// ============================================
// TEST MASHUP
// ============================================

/// Hook that records terminations instead of exiting.
#[derive(Default)]
pub struct RecordingHook {
    calls: Mutex<Vec<(i32, Instant)>>,
}

impl RecordingHook {
    pub fn calls(&self) -> Vec<(i32, Instant)> {
        self.calls.lock().expect("hook mutex poisoned").clone()
    }
}

impl ShutdownHook for RecordingHook {
    fn terminate(&self, exit_code: i32) {
        self.calls
            .lock()
            .expect("hook mutex poisoned")
            .push((exit_code, Instant::now()));
    }
}

pub struct TestMashup {
    pub service: MashupService,
    pub handle: MashupServerHandle,
    pub hook: Arc<RecordingHook>,
}

impl TestMashup {
    pub fn url(&self) -> String {
        format!("ws://{}/", self.handle.local_addr())
    }

    /// Test helper: open a plain WebSocket client to the mashup.
    pub async fn connect(&self) -> MashupPeerClient {
        MashupPeerClient::connect(&self.url(), self.service.max_message_size())
            .await
            .expect("Failed to connect to mashup")
    }
}

/// Test helper: builder for a mashup with bootstrap [`TEST_BOOTSTRAP_TOKEN`],
/// signal handling off and the given trust anchor.
pub fn mashup_builder(cert_pem: Option<&str>) -> MashupServiceBuilder {
    let builder = MashupService::builder()
        .with_handshake_config(ConnectionConfig::new(TEST_BOOTSTRAP_TOKEN, "127.0.0.1", 0))
        .with_signal_handling(false)
        .with_connect_timeout(Duration::from_secs(5));

    match cert_pem {
        Some(pem) => builder.with_certificate_pem(pem.as_bytes()),
        None => builder.with_certificate_slot(CertificateSlot::Missing),
    }
}

/// Test helper: build the service with a recording hook and serve it over
/// plain WebSocket on an ephemeral port.
pub async fn start_test_mashup(builder: MashupServiceBuilder) -> TestMashup {
    let hook = Arc::new(RecordingHook::default());
    let service = builder
        .with_shutdown_hook(hook.clone())
        .build()
        .expect("Failed to build service");
    let handle = start_mashup_server("127.0.0.1:0", None, service.clone())
        .await
        .expect("Failed to start mashup server");

    TestMashup {
        service,
        handle,
        hook,
    }
}

/// Test helper: a `CollaborateInit` request pointing at `host_port`.
pub fn handshake_request(auth_token: &str, host_port: u16) -> MashupConnectionConfigs {
    MashupConnectionConfigs {
        auth_token: auth_token.to_string(),
        caller_token: TEST_CALLER_TOKEN.to_string(),
        server: "localhost".to_string(),
        port: i64::from(host_port),
    }
}

/// Test helper: host + mashup + completed handshake, returning the session
/// credential.
pub async fn established(
    builder: impl FnOnce(MashupServiceBuilder) -> MashupServiceBuilder,
) -> (TestHost, TestMashup, MashupPeerClient, String) {
    let certs = generate_certs();
    let host = start_test_host(&certs).await;
    let mashup = start_test_mashup(builder(mashup_builder(Some(&certs.cert_pem)))).await;
    let client = mashup.connect().await;

    let session = client
        .collaborate_init(handshake_request(TEST_BOOTSTRAP_TOKEN, host.port))
        .await
        .expect("Handshake should succeed");

    (host, mashup, client, session.auth_token)
}

// ============================================
// HANDLER DOUBLES
// ============================================

/// Handler with a fixed element graph that counts calls.
#[derive(Default)]
pub struct CountingHandler {
    calls: AtomicUsize,
}

impl CountingHandler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn fixed_elements() -> MashupDetailedElementBundle {
    MashupDetailedElementBundle {
        auth_token: String::new(),
        detailed_elements: vec![
            MashupDetailedElement {
                id: 1,
                name: "Outside".to_string(),
                genre: "Space".to_string(),
                childids: vec![2],
                ..Default::default()
            },
            MashupDetailedElement {
                id: 2,
                name: "Inside".to_string(),
                genre: "Space".to_string(),
                parentids: vec![1],
                ..Default::default()
            },
        ],
    }
}

impl MashupApiHandler for CountingHandler {
    fn get_elements(&self) -> Result<MashupDetailedElementBundle, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(fixed_elements())
    }

    fn upsert_elements(
        &self,
        bundle: MashupDetailedElementBundle,
    ) -> Result<MashupDetailedElementBundle, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(bundle)
    }

    fn tweak_states(
        &self,
        bundle: MashupElementStateBundle,
    ) -> Result<MashupElementStateBundle, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(bundle)
    }

    fn tweak_states_by_motiv(&self, _motiv: Motiv) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_display_change(&self, _hint: &MashupDisplayHint) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handler whose every fallible operation fails.
pub struct FailingHandler;

impl MashupApiHandler for FailingHandler {
    fn get_elements(&self) -> Result<MashupDetailedElementBundle, HandlerError> {
        Err(HandlerError::new("Could not get items."))
    }

    fn upsert_elements(
        &self,
        _bundle: MashupDetailedElementBundle,
    ) -> Result<MashupDetailedElementBundle, HandlerError> {
        Err(HandlerError::new("Could not capture items."))
    }

    fn tweak_states(
        &self,
        _bundle: MashupElementStateBundle,
    ) -> Result<MashupElementStateBundle, HandlerError> {
        Err(HandlerError::new("Could not capture items."))
    }

    fn tweak_states_by_motiv(&self, _motiv: Motiv) -> Result<(), HandlerError> {
        Err(HandlerError::new("Could not capture items."))
    }

    fn on_display_change(&self, _hint: &MashupDisplayHint) {}
}
