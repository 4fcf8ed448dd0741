use crate::error::session::SessionError;
use crate::session::connection_config::ConnectionConfig;

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};

/// Commands that mutate the store.
///
/// All mutations go through the store actor so concurrent handshakes are
/// applied one at a time, in arrival order.
#[derive(Debug, Clone)]
pub enum StoreCommand {
    /// Record a newly established session and the peer that opened it.
    Establish {
        session: ConnectionConfig,
        peer: ConnectionConfig,
    },
}

/// Whether a handshake has completed in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unestablished,
    Established,
}

type Envelope = (StoreCommand, oneshot::Sender<()>);

/// Process-wide connection configuration, shared by handle.
///
/// This type is `Clone`; all clones share the same underlying state. Reads
/// go through `RwLock`s, writes through the actor task, which is spawned
/// lazily on the first update.
#[derive(Clone)]
pub struct ConnectionStore {
    /// Channel to the store actor
    command_tx: Arc<Mutex<Option<mpsc::Sender<Envelope>>>>,

    /// Bootstrap config, fixed for the life of the process
    handshake: Arc<ConnectionConfig>,

    session: Arc<RwLock<Option<ConnectionConfig>>>,

    peer: Arc<RwLock<Option<ConnectionConfig>>>,

    actor_init: Arc<Mutex<bool>>,
}

impl ConnectionStore {
    pub fn new(handshake: ConnectionConfig) -> Self {
        Self {
            command_tx: Arc::new(Mutex::new(None)),
            handshake: Arc::new(handshake),
            session: Arc::new(RwLock::new(None)),
            peer: Arc::new(RwLock::new(None)),
            actor_init: Arc::new(Mutex::new(false)),
        }
    }

    /// Apply a command and wait until the actor has applied it.
    ///
    /// Returning only after the write lands means a caller that just minted a
    /// session token can hand it out knowing the next read will see it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::State`] if the actor has died.
    pub async fn update(&self, cmd: StoreCommand) -> Result<(), SessionError> {
        self.ensure_actor().await;

        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let tx_guard = self.command_tx.lock().await;
            let tx = tx_guard
                .as_ref()
                .ok_or_else(|| SessionError::state("Store actor not initialized"))?;

            tx.send((cmd, ack_tx))
                .await
                .map_err(|e| SessionError::state(format!("Store actor died: {e}")))?;
        }

        ack_rx
            .await
            .map_err(|e| SessionError::state(format!("Store actor dropped update: {e}")))
    }

    pub fn handshake_config(&self) -> &ConnectionConfig {
        &self.handshake
    }

    pub async fn session_config(&self) -> Option<ConnectionConfig> {
        self.session.read().await.clone()
    }

    pub async fn peer_config(&self) -> Option<ConnectionConfig> {
        self.peer.read().await.clone()
    }

    pub async fn state(&self) -> SessionState {
        if self.session.read().await.is_some() {
            SessionState::Established
        } else {
            SessionState::Unestablished
        }
    }

    /// Compare a presented credential with the session credential.
    ///
    /// The read lock is held only for the comparison.
    pub async fn session_token_matches(&self, presented: &str) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|session| session.auth_token.matches(presented))
    }

    pub fn handshake_token_matches(&self, presented: &str) -> bool {
        self.handshake.auth_token.matches(presented)
    }

    async fn ensure_actor(&self) {
        let mut init_guard = self.actor_init.lock().await;
        if !*init_guard {
            let (tx, rx) = mpsc::channel(16);

            let mut tx_guard = self.command_tx.lock().await;
            *tx_guard = Some(tx);
            drop(tx_guard);

            tokio::spawn(store_actor(
                rx,
                Arc::clone(&self.session),
                Arc::clone(&self.peer),
            ));
            *init_guard = true;
            info!("Connection store actor spawned");
        }
    }
}

/// Owns all writes to the session and peer configs.
async fn store_actor(
    mut command_rx: mpsc::Receiver<Envelope>,
    session: Arc<RwLock<Option<ConnectionConfig>>>,
    peer: Arc<RwLock<Option<ConnectionConfig>>>,
) {
    info!("Connection store actor started");

    while let Some((cmd, ack)) = command_rx.recv().await {
        match cmd {
            StoreCommand::Establish {
                session: new_session,
                peer: new_peer,
            } => {
                // Both locks are taken before either write so readers see
                // the pair change atomically.
                let mut session_write = session.write().await;
                let mut peer_write = peer.write().await;

                if let Some(ref existing) = *peer_write {
                    warn!(
                        "Replacing established session (peer {}) with new session (peer {})",
                        existing.authority(),
                        new_peer.authority()
                    );
                } else {
                    info!("Session established with peer {}", new_peer.authority());
                }

                *session_write = Some(new_session);
                *peer_write = Some(new_peer);
            }
        }

        // Receiver may have given up (cancelled call); the write stands.
        let _ = ack.send(());
    }

    warn!("Connection store actor stopped");
}
