//! The `CollaborateInit` exchange.
//!
//! A host proves it knows the bootstrap credential, advertises where it can
//! be reached, and receives a session credential in return. Before answering,
//! the mashup opens a TLS channel back to the host, trusting only the
//! certificate it was started with.

use crate::context::MashupContext;
use crate::dispatch::DelegationDispatcher;
use crate::error::session::SessionError;
use crate::error::tls::TlsError;
use crate::ipc::MashupPeerClient;
use crate::lifecycle::LifecycleController;
use crate::proto::MashupConnectionConfigs;
use crate::session::{ConnectionConfig, ConnectionStore, StoreCommand};
use crate::tls::{CertificateMaterial, build_client_config};

use common::ErrorLocation;

use std::net::SocketAddr;
use std::panic::Location;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::{error, info, warn};
use rustls::ClientConfig;
use tokio::sync::watch;
use uuid::Uuid;

/// Upper bound on opening the reverse channel.
pub const PEER_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The trust anchor as configured at startup.
#[derive(Debug, Clone, Default)]
pub enum CertificateSlot {
    Loaded(CertificateMaterial),
    #[default]
    Missing,
    /// Material was supplied but could not be parsed.
    Invalid(String),
}

impl CertificateSlot {
    /// Load a slot from PEM bytes, keeping a parse failure for later
    /// reporting instead of failing startup.
    pub fn from_pem(pem: &[u8]) -> Self {
        match CertificateMaterial::from_pem(pem) {
            Ok(material) => CertificateSlot::Loaded(material),
            Err(TlsError::Missing { .. }) => CertificateSlot::Missing,
            Err(e) => {
                warn!("Certificate material rejected: {e}");
                CertificateSlot::Invalid(e.to_string())
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, CertificateSlot::Loaded(_))
    }

    /// # Errors
    ///
    /// [`SessionError::Configuration`] unless material is loaded and usable.
    #[track_caller]
    fn client_config(&self, insecure: bool) -> Result<Arc<ClientConfig>, SessionError> {
        match self {
            CertificateSlot::Loaded(material) => Ok(build_client_config(material, insecure)?),
            CertificateSlot::Missing => Err(SessionError::Configuration {
                message: String::from("Cert not initialized"),
                location: ErrorLocation::from(Location::caller()),
            }),
            CertificateSlot::Invalid(reason) => Err(SessionError::Configuration {
                message: format!("Cert initialization failure: {reason}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

#[derive(Clone)]
pub struct HandshakeCoordinator {
    pub(crate) store: ConnectionStore,
    pub(crate) context: MashupContext,
    pub(crate) dispatcher: DelegationDispatcher,
    pub(crate) lifecycle: LifecycleController,
    pub(crate) certificate: CertificateSlot,
    pub(crate) insecure_skip_verify: bool,
    pub(crate) connect_timeout: Duration,
    pub(crate) max_message_size: usize,
    pub(crate) completed: Arc<watch::Sender<bool>>,
    /// Listener address, used for the session config when the bootstrap
    /// port was 0.
    pub(crate) local_addr: Arc<OnceLock<SocketAddr>>,
}

impl HandshakeCoordinator {
    /// Exchange the bootstrap credential for a session credential.
    ///
    /// Checks run in order: bootstrap credential, certificate, reverse
    /// channel. Nothing is stored unless all three pass. A repeated
    /// handshake replaces the previous session.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Auth`] - wrong bootstrap credential
    /// - [`SessionError::Configuration`] - certificate missing or unusable
    /// - [`SessionError::Transport`] - the host could not be reached
    /// - [`SessionError::State`] - the store actor is gone
    pub async fn collaborate_init(
        &self,
        request: MashupConnectionConfigs,
    ) -> Result<MashupConnectionConfigs, SessionError> {
        info!("CollaborateInit called");

        if !self.store.handshake_token_matches(&request.auth_token) {
            warn!("CollaborateInit rejected: bootstrap credential mismatch");
            return Err(SessionError::auth("auth failure"));
        }

        let tls = self.certificate.client_config(self.insecure_skip_verify)?;
        let peer = ConnectionConfig::peer_from_request(&request)?;

        info!(
            "Initiating connection to {} with insecure: {}",
            peer.authority(),
            self.insecure_skip_verify
        );
        let client = MashupPeerClient::connect_tls(
            &peer,
            tls,
            self.connect_timeout,
            self.max_message_size,
        )
        .await
        .map_err(|e| {
            error!("Did not connect to {}: {e}", peer.authority());
            SessionError::transport(format!(
                "Could not open channel to {}: {e}",
                peer.authority()
            ))
        })?;
        info!("Connection to {} established", peer.authority());

        // Store update, link swap and context registration form one commit;
        // a concurrent handshake or teardown waits for it to finish.
        let commit = self.context.lock_commit().await;

        if self.lifecycle.is_shutdown_requested() {
            drop(commit);
            warn!("CollaborateInit abandoned: shutdown in progress");
            client.close().await;
            return Err(SessionError::state("Shutdown in progress"));
        }

        let session = self.mint_session();
        self.store
            .update(StoreCommand::Establish {
                session: session.clone(),
                peer: peer.clone(),
            })
            .await?;

        if let Some(previous) = self.context.install(client, peer).await {
            tokio::spawn(async move { previous.close().await });
        }

        self.lifecycle.arm_signal_processor();
        self.dispatcher.register_context(&self.context);
        self.completed.send_replace(true);
        drop(commit);

        info!("CollaborateInit complete");
        Ok(session.to_wire())
    }

    /// New session config: fresh credential, the mashup's own address.
    fn mint_session(&self) -> ConnectionConfig {
        let handshake = self.store.handshake_config();

        let token = loop {
            let candidate = Uuid::new_v4().to_string();
            if !handshake.auth_token.matches(&candidate) {
                break candidate;
            }
            warn!("Minted credential equals bootstrap credential, regenerating");
        };

        let port = match (handshake.port, self.local_addr.get()) {
            (0, Some(addr)) => addr.port(),
            (port, _) => port,
        };

        ConnectionConfig::new(token, handshake.server.clone(), port)
    }
}
