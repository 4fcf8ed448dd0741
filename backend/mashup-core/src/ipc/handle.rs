//! Handle to a running mashup server.

use std::net::SocketAddr;

use log::info;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Handle returned by [`start_mashup_server`](crate::ipc::start_mashup_server).
///
/// Dropping the handle does **not** stop the server; call [`stop`](Self::stop).
/// Stopping closes the listener and sends a close frame on every open
/// connection, so no connection outlives the server.
pub struct MashupServerHandle {
    pub(crate) local_addr: SocketAddr,
    pub(crate) stop: broadcast::Sender<()>,
    pub(crate) task: JoinHandle<()>,
}

impl MashupServerHandle {
    /// Address the listener is bound to (with the real port when bound to 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Ask the accept loop and all connections to shut down.
    pub fn stop(&self) {
        info!("Stopping mashup server on {}", self.local_addr);
        let _ = self.stop.send(());
    }

    /// Wait for the accept loop to exit.
    pub async fn stopped(self) {
        let _ = self.task.await;
    }
}
