//! The mashup's RPC surface, wired from its components.

use crate::auth::AuthorizationGuard;
use crate::config::{DEFAULT_MAX_MESSAGE_SIZE, MashupConfig};
use crate::context::MashupContext;
use crate::dispatch::DelegationDispatcher;
use crate::error::config::ConfigError;
use crate::error::session::SessionError;
use crate::handler::MashupApiHandler;
use crate::handshake::{CertificateSlot, HandshakeCoordinator, PEER_CONNECT_TIMEOUT};
use crate::lifecycle::{LifecycleController, ProcessExitHook, ShutdownHook};
use crate::proto::{
    MashupConnectionConfigs, MashupDetailedElementBundle, MashupDisplayBundle, MashupDisplayHint,
    MashupElementStateBundle, MashupEmpty, Motiv,
};
use crate::session::{ConnectionConfig, ConnectionStore};
use crate::tls::CertificateMaterial;

use common::ErrorLocation;

use std::net::SocketAddr;
use std::panic::Location;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::{debug, info};
use tokio::sync::watch;

/// One mashup process's protocol endpoint.
///
/// Cheap to clone; the server hands a clone to every request task.
#[derive(Clone)]
pub struct MashupService {
    store: ConnectionStore,
    guard: AuthorizationGuard,
    dispatcher: DelegationDispatcher,
    handshake: HandshakeCoordinator,
    lifecycle: LifecycleController,
    context: MashupContext,
    handshake_done: Arc<watch::Sender<bool>>,
    local_addr: Arc<OnceLock<SocketAddr>>,
    max_message_size: usize,
}

impl MashupService {
    pub fn builder() -> MashupServiceBuilder {
        MashupServiceBuilder::default()
    }

    pub async fn collaborate_init(
        &self,
        request: MashupConnectionConfigs,
    ) -> Result<MashupConnectionConfigs, SessionError> {
        self.handshake.collaborate_init(request).await
    }

    /// Acknowledge and schedule termination.
    pub async fn shutdown(&self, request: MashupEmpty) -> Result<MashupEmpty, SessionError> {
        info!("Shutdown called");
        self.guard.authorize("Shutdown", &request.auth_token).await?;
        self.lifecycle.schedule_termination();
        Ok(MashupEmpty::default())
    }

    pub async fn get_elements(
        &self,
        request: MashupEmpty,
    ) -> Result<MashupDetailedElementBundle, SessionError> {
        info!("GetElements called");
        self.guard
            .authorize("GetElements", &request.auth_token)
            .await?;
        self.dispatcher.get_elements()
    }

    pub async fn upsert_elements(
        &self,
        request: MashupDetailedElementBundle,
    ) -> Result<MashupDetailedElementBundle, SessionError> {
        info!("UpsertElements called");
        self.guard
            .authorize("UpsertElements", &request.auth_token)
            .await?;
        self.dispatcher.upsert_elements(request)
    }

    pub async fn tweak_states(
        &self,
        request: MashupElementStateBundle,
    ) -> Result<MashupElementStateBundle, SessionError> {
        info!("TweakStates called");
        self.guard
            .authorize("TweakStates", &request.auth_token)
            .await?;
        self.dispatcher.tweak_states(request)
    }

    pub async fn tweak_states_by_motiv(&self, request: Motiv) -> Result<MashupEmpty, SessionError> {
        info!("TweakStatesByMotiv called");
        self.guard
            .authorize("TweakStatesByMotiv", &request.auth_token)
            .await?;
        self.dispatcher.tweak_states_by_motiv(request)
    }

    /// Echoes the received hint (a default hint if none was sent).
    pub async fn on_display_change(
        &self,
        request: MashupDisplayBundle,
    ) -> Result<MashupDisplayHint, SessionError> {
        info!("OnDisplayChange called");
        self.guard
            .authorize("OnDisplayChange", &request.auth_token)
            .await?;
        let hint = request.display_hint.unwrap_or_default();
        Ok(self.dispatcher.on_display_change(hint))
    }

    /// Resolves once the first handshake has completed (immediately if one
    /// already has).
    pub async fn wait_for_handshake(&self) {
        let mut rx = self.handshake_done.subscribe();
        // The sender lives as long as `self`.
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Resolves once the peer or a signal has asked this process to stop.
    pub async fn wait_for_shutdown_request(&self) {
        self.lifecycle.shutdown_requested().await;
    }

    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    pub fn context(&self) -> &MashupContext {
        &self.context
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Remember where the server ended up listening.
    pub(crate) fn record_local_addr(&self, addr: SocketAddr) {
        if self.local_addr.set(addr).is_err() {
            debug!("Listener address already recorded");
        }
    }
}

/// Builder for [`MashupService`].
///
/// Only the handshake config is required. Defaults: no certificate (every
/// handshake fails with a configuration error), no handler (soft no-op),
/// [`ProcessExitHook`], signal handling on, [`PEER_CONNECT_TIMEOUT`] and
/// [`DEFAULT_MAX_MESSAGE_SIZE`].
#[derive(Default)]
pub struct MashupServiceBuilder {
    handshake: Option<ConnectionConfig>,
    certificate: CertificateSlot,
    insecure_skip_verify: bool,
    handler: Option<Arc<dyn MashupApiHandler>>,
    shutdown_hook: Option<Arc<dyn ShutdownHook>>,
    signal_handling: Option<bool>,
    connect_timeout: Option<Duration>,
    max_message_size: Option<usize>,
}

impl MashupServiceBuilder {
    /// Seed a builder from resolved configuration.
    pub fn from_config(config: &MashupConfig) -> Self {
        Self::default()
            .with_handshake_config(ConnectionConfig::new(
                config.handshake_token.clone(),
                config.bind_host.clone(),
                config.port,
            ))
            .with_certificate_slot(config.certificate_slot())
            .with_insecure_skip_verify(config.insecure_skip_verify)
            .with_max_message_size(config.max_message_size)
    }

    /// Bootstrap credential plus the address reported back in the session
    /// config.
    pub fn with_handshake_config(mut self, handshake: ConnectionConfig) -> Self {
        self.handshake = Some(handshake);
        self
    }

    pub fn with_certificate(mut self, material: CertificateMaterial) -> Self {
        self.certificate = CertificateSlot::Loaded(material);
        self
    }

    /// Parse failures are kept and reported at handshake time.
    pub fn with_certificate_pem(mut self, pem: &[u8]) -> Self {
        self.certificate = CertificateSlot::from_pem(pem);
        self
    }

    pub fn with_certificate_slot(mut self, slot: CertificateSlot) -> Self {
        self.certificate = slot;
        self
    }

    pub fn with_insecure_skip_verify(mut self, insecure: bool) -> Self {
        self.insecure_skip_verify = insecure;
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn MashupApiHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_shutdown_hook(mut self, hook: Arc<dyn ShutdownHook>) -> Self {
        self.shutdown_hook = Some(hook);
        self
    }

    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.signal_handling = Some(enabled);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }

    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the handshake config is missing
    /// or carries an empty token, or the message size is zero.
    pub fn build(self) -> Result<MashupService, ConfigError> {
        let handshake = self.handshake.ok_or_else(|| ConfigError::Invalid {
            location: ErrorLocation::from(Location::caller()),
            reason: "Handshake config is required".to_string(),
        })?;

        if handshake.auth_token.is_empty() {
            return Err(ConfigError::Invalid {
                location: ErrorLocation::from(Location::caller()),
                reason: "Handshake token cannot be empty".to_string(),
            });
        }

        let max_message_size = self.max_message_size.unwrap_or(DEFAULT_MAX_MESSAGE_SIZE);
        if max_message_size == 0 {
            return Err(ConfigError::Invalid {
                location: ErrorLocation::from(Location::caller()),
                reason: "max_message_size must be greater than 0".to_string(),
            });
        }

        let store = ConnectionStore::new(handshake);
        let context = MashupContext::new();
        let dispatcher = DelegationDispatcher::new(self.handler);
        let hook = self
            .shutdown_hook
            .unwrap_or_else(|| Arc::new(ProcessExitHook));
        let lifecycle = LifecycleController::new(
            hook,
            context.clone(),
            self.signal_handling.unwrap_or(true),
        );
        let (handshake_done, _) = watch::channel(false);
        let handshake_done = Arc::new(handshake_done);
        let local_addr = Arc::new(OnceLock::new());

        let coordinator = HandshakeCoordinator {
            store: store.clone(),
            context: context.clone(),
            dispatcher: dispatcher.clone(),
            lifecycle: lifecycle.clone(),
            certificate: self.certificate,
            insecure_skip_verify: self.insecure_skip_verify,
            connect_timeout: self.connect_timeout.unwrap_or(PEER_CONNECT_TIMEOUT),
            max_message_size,
            completed: Arc::clone(&handshake_done),
            local_addr: Arc::clone(&local_addr),
        };

        Ok(MashupService {
            guard: AuthorizationGuard::new(store.clone()),
            store,
            dispatcher,
            handshake: coordinator,
            lifecycle,
            context,
            handshake_done,
            local_addr,
            max_message_size,
        })
    }
}
