//! Reverse channel to the host, shared with the capability handler.

use crate::error::ipc::IpcError;
use crate::ipc::MashupPeerClient;
use crate::session::ConnectionConfig;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::{Mutex, MutexGuard, RwLock};

struct PeerLink {
    client: MashupPeerClient,
    peer: ConnectionConfig,
}

/// Handle to the connection the handshake opened back to the host.
///
/// Cloning is cheap; all clones see the same link. Empty until the first
/// successful handshake.
#[derive(Clone, Default)]
pub struct MashupContext {
    link: Arc<RwLock<Option<PeerLink>>>,
    /// Held while a handshake commits or the link is torn down, so the
    /// store and the link always describe the same peer.
    commit: Arc<Mutex<()>>,
}

impl MashupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client for calling the host, if a handshake has completed.
    pub async fn client(&self) -> Option<MashupPeerClient> {
        self.link.read().await.as_ref().map(|link| link.client.clone())
    }

    pub async fn peer_config(&self) -> Option<ConnectionConfig> {
        self.link.read().await.as_ref().map(|link| link.peer.clone())
    }

    pub async fn is_connected(&self) -> bool {
        self.link.read().await.is_some()
    }

    /// Exclusive access for changing which peer this mashup is bound to.
    pub(crate) async fn lock_commit(&self) -> MutexGuard<'_, ()> {
        self.commit.lock().await
    }

    /// Install a new link, returning the client it replaces.
    pub(crate) async fn install(
        &self,
        client: MashupPeerClient,
        peer: ConnectionConfig,
    ) -> Option<MashupPeerClient> {
        let mut link = self.link.write().await;
        link.replace(PeerLink { client, peer }).map(|old| old.client)
    }

    /// Tell the host this mashup is going away.
    ///
    /// Presents the caller credential the host handed over at handshake time.
    ///
    /// # Errors
    ///
    /// [`IpcError::Closed`] if there is no link, otherwise whatever the call
    /// or the timeout produce.
    pub async fn notify_peer_shutdown(&self, timeout: Duration) -> Result<(), IpcError> {
        let (client, token) = {
            let guard = self.link.read().await;
            let link = guard.as_ref().ok_or_else(|| IpcError::Closed {
                message: String::from("No peer link established"),
                location: ErrorLocation::from(Location::caller()),
            })?;
            (link.client.clone(), link.peer.auth_token.as_str().to_string())
        };

        info!("Notifying peer of shutdown");
        tokio::time::timeout(timeout, client.shutdown(&token))
            .await
            .map_err(|_| IpcError::Timeout {
                message: format!("Peer did not acknowledge shutdown within {timeout:?}"),
                location: ErrorLocation::from(Location::caller()),
            })?
    }

    /// Drop the link and close its connection.
    pub async fn close(&self) {
        let _commit = self.lock_commit().await;
        let taken = self.link.write().await.take();
        match taken {
            Some(link) => {
                link.client.close().await;
                info!("Closed peer link to {}", link.peer.authority());
            }
            None => warn!("Close requested but no peer link was open"),
        }
    }
}
