//! Calling side of the mashup RPC protocol.

use crate::error::ipc::IpcError;
use crate::ipc::frame::{encode_frame, websocket_config, write_loop};
use crate::proto::{
    MashupConnectionConfigs, MashupDetailedElementBundle, MashupDisplayBundle, MashupDisplayHint,
    MashupElementStateBundle, MashupEmpty, MashupErrorCode, MashupRequest, MashupResponse, Motiv,
    mashup_request, mashup_response,
};
use crate::session::ConnectionConfig;

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::SplitStream;
use log::{debug, error, info, warn};
use prost::Message as ProstMessage;
use rustls::ClientConfig;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, client_async_with_config, connect_async_with_config};

/// How long a call waits for its response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long [`MashupPeerClient::close`] waits for the close handshake.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

const OUTBOUND_CAPACITY: usize = 64;

/// Callers waiting for a response, keyed by request id.
#[derive(Default)]
struct Pending {
    waiters: HashMap<u64, oneshot::Sender<MashupResponse>>,
    /// Set once the reader has stopped; nothing will resolve new waiters.
    closed: bool,
}

type PendingMap = Arc<Mutex<Pending>>;

struct ClientInner {
    outbound: mpsc::Sender<Message>,
    pending: PendingMap,
    next_request_id: AtomicU64,
    request_timeout: Duration,
    reader: Mutex<Option<JoinHandle<()>>>,
}

/// A WebSocket connection to a mashup-protocol endpoint.
///
/// Calls may be issued concurrently from any number of clones; responses are
/// matched to callers by `request_id`, so they may arrive in any order.
#[derive(Clone)]
pub struct MashupPeerClient {
    inner: Arc<ClientInner>,
}

impl MashupPeerClient {
    /// Connect over plain WebSocket (`ws://host:port/`), with the same frame
    /// limits as [`connect_tls`](Self::connect_tls).
    ///
    /// # Errors
    ///
    /// [`IpcError::Handshake`] if the connection or upgrade fails.
    pub async fn connect(url: &str, max_message_size: usize) -> Result<Self, IpcError> {
        let (ws, _response) =
            connect_async_with_config(url, Some(websocket_config(max_message_size)), false)
                .await
                .map_err(|e| IpcError::Handshake {
                    message: format!("Failed to connect to {url}: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;

        info!("Connected to {url}");
        Ok(Self::from_stream(ws))
    }

    /// Connect to `peer` over TLS, verifying it with `tls`.
    ///
    /// The whole sequence (TCP, TLS, WebSocket upgrade) is bounded by
    /// `connect_timeout`.
    ///
    /// # Errors
    ///
    /// - [`IpcError::Io`] if the TCP connection is refused
    /// - [`IpcError::Handshake`] if TLS verification or the upgrade fails
    /// - [`IpcError::Timeout`] if the peer does not finish in time
    pub async fn connect_tls(
        peer: &ConnectionConfig,
        tls: Arc<ClientConfig>,
        connect_timeout: Duration,
        max_message_size: usize,
    ) -> Result<Self, IpcError> {
        let authority = peer.authority();
        let server_name =
            ServerName::try_from(peer.server.clone()).map_err(|e| IpcError::Handshake {
                message: format!("Invalid peer server name '{}': {e}", peer.server),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let connect = async {
            let tcp = TcpStream::connect(authority.as_str()).await?;

            let tls_stream = TlsConnector::from(tls)
                .connect(server_name, tcp)
                .await
                .map_err(|e| IpcError::Handshake {
                    message: format!("TLS handshake with {authority} failed: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            let url = format!("wss://{authority}/");
            let (ws, _response) = client_async_with_config(
                url,
                tls_stream,
                Some(websocket_config(max_message_size)),
            )
            .await
            .map_err(|e| IpcError::Handshake {
                message: format!("WebSocket upgrade with {authority} failed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

            Ok::<_, IpcError>(ws)
        };

        let ws = tokio::time::timeout(connect_timeout, connect)
            .await
            .map_err(|_| IpcError::Timeout {
                message: format!("Connecting to {authority} took longer than {connect_timeout:?}"),
                location: ErrorLocation::from(Location::caller()),
            })??;

        info!("Opened TLS channel to {authority}");
        Ok(Self::from_stream(ws))
    }

    /// Wrap an already-upgraded WebSocket.
    pub fn from_stream<S>(ws: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (write, read) = ws.split();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let pending: PendingMap = Arc::new(Mutex::new(Pending::default()));

        tokio::spawn(write_loop(write, outbound_rx));
        let reader = tokio::spawn(read_loop(read, Arc::clone(&pending)));

        Self {
            inner: Arc::new(ClientInner {
                outbound: outbound_tx,
                pending,
                next_request_id: AtomicU64::new(1),
                request_timeout: DEFAULT_REQUEST_TIMEOUT,
                reader: Mutex::new(Some(reader)),
            }),
        }
    }

    /// Send one request and wait for its response payload.
    ///
    /// # Errors
    ///
    /// - [`IpcError::Remote`] if the peer answered with an error frame
    /// - [`IpcError::Closed`] if the connection went away first
    /// - [`IpcError::Timeout`] if no response arrived in time
    pub async fn call(
        &self,
        payload: mashup_request::Payload,
    ) -> Result<mashup_response::Payload, IpcError> {
        let request_id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        let operation = payload.operation();
        let frame = encode_frame(&MashupRequest {
            request_id,
            payload: Some(payload),
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        {
            let mut pending = self.inner.pending.lock().await;
            if pending.closed {
                return Err(IpcError::Closed {
                    message: format!("Connection closed; cannot send {operation}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            pending.waiters.insert(request_id, response_tx);
        }

        debug!("Sending {operation} (request {request_id})");
        if self.inner.outbound.send(frame).await.is_err() {
            self.inner.pending.lock().await.waiters.remove(&request_id);
            return Err(IpcError::Closed {
                message: format!("Connection closed before {operation} was sent"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let response = match tokio::time::timeout(self.inner.request_timeout, response_rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(IpcError::Closed {
                    message: format!("Connection closed while waiting for {operation}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Err(_) => {
                self.inner.pending.lock().await.waiters.remove(&request_id);
                return Err(IpcError::Timeout {
                    message: format!(
                        "{operation} (request {request_id}) got no response within {:?}",
                        self.inner.request_timeout
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        match response.payload {
            Some(mashup_response::Payload::Error(err)) => Err(IpcError::Remote {
                code: MashupErrorCode::from_wire(err.code),
                message: err.message,
                location: ErrorLocation::from(Location::caller()),
            }),
            Some(payload) => Ok(payload),
            None => Err(IpcError::ProtobufDecode {
                message: format!("Response to {operation} had no payload"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    pub async fn collaborate_init(
        &self,
        configs: MashupConnectionConfigs,
    ) -> Result<MashupConnectionConfigs, IpcError> {
        match self
            .call(mashup_request::Payload::CollaborateInit(configs))
            .await?
        {
            mashup_response::Payload::ConnectionConfigs(configs) => Ok(configs),
            other => Err(unexpected("CollaborateInit", &other)),
        }
    }

    pub async fn shutdown(&self, auth_token: &str) -> Result<(), IpcError> {
        match self
            .call(mashup_request::Payload::Shutdown(MashupEmpty {
                auth_token: auth_token.to_string(),
            }))
            .await?
        {
            mashup_response::Payload::Empty(_) => Ok(()),
            other => Err(unexpected("Shutdown", &other)),
        }
    }

    pub async fn get_elements(
        &self,
        auth_token: &str,
    ) -> Result<MashupDetailedElementBundle, IpcError> {
        match self
            .call(mashup_request::Payload::GetElements(MashupEmpty {
                auth_token: auth_token.to_string(),
            }))
            .await?
        {
            mashup_response::Payload::DetailedElementBundle(bundle) => Ok(bundle),
            other => Err(unexpected("GetElements", &other)),
        }
    }

    pub async fn upsert_elements(
        &self,
        bundle: MashupDetailedElementBundle,
    ) -> Result<MashupDetailedElementBundle, IpcError> {
        match self
            .call(mashup_request::Payload::UpsertElements(bundle))
            .await?
        {
            mashup_response::Payload::DetailedElementBundle(bundle) => Ok(bundle),
            other => Err(unexpected("UpsertElements", &other)),
        }
    }

    pub async fn tweak_states(
        &self,
        bundle: MashupElementStateBundle,
    ) -> Result<MashupElementStateBundle, IpcError> {
        match self
            .call(mashup_request::Payload::TweakStates(bundle))
            .await?
        {
            mashup_response::Payload::ElementStateBundle(bundle) => Ok(bundle),
            other => Err(unexpected("TweakStates", &other)),
        }
    }

    pub async fn tweak_states_by_motiv(&self, motiv: Motiv) -> Result<(), IpcError> {
        match self
            .call(mashup_request::Payload::TweakStatesByMotiv(motiv))
            .await?
        {
            mashup_response::Payload::Empty(_) => Ok(()),
            other => Err(unexpected("TweakStatesByMotiv", &other)),
        }
    }

    pub async fn on_display_change(
        &self,
        bundle: MashupDisplayBundle,
    ) -> Result<MashupDisplayHint, IpcError> {
        match self
            .call(mashup_request::Payload::OnDisplayChange(bundle))
            .await?
        {
            mashup_response::Payload::DisplayHint(hint) => Ok(hint),
            other => Err(unexpected("OnDisplayChange", &other)),
        }
    }

    /// Close the connection.
    ///
    /// Sends a close frame, waits briefly for the peer to finish the close
    /// handshake, then drops the socket. Outstanding calls fail with
    /// [`IpcError::Closed`].
    pub async fn close(&self) {
        if self.inner.outbound.send(Message::Close(None)).await.is_err() {
            debug!("Connection already closed");
        }

        let reader = self.inner.reader.lock().await.take();
        if let Some(mut reader) = reader {
            if tokio::time::timeout(CLOSE_GRACE, &mut reader).await.is_err() {
                warn!("Peer did not complete close handshake; dropping connection");
                reader.abort();
            }
        }

        let mut pending = self.inner.pending.lock().await;
        pending.closed = true;
        pending.waiters.clear();
    }
}

#[track_caller]
fn unexpected(operation: &str, payload: &mashup_response::Payload) -> IpcError {
    let kind = match payload {
        mashup_response::Payload::ConnectionConfigs(_) => "ConnectionConfigs",
        mashup_response::Payload::Empty(_) => "Empty",
        mashup_response::Payload::DetailedElementBundle(_) => "DetailedElementBundle",
        mashup_response::Payload::ElementStateBundle(_) => "ElementStateBundle",
        mashup_response::Payload::DisplayHint(_) => "DisplayHint",
        mashup_response::Payload::Error(_) => "Error",
    };

    IpcError::ProtobufDecode {
        message: format!("Unexpected {kind} response to {operation}"),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Route responses to their waiting callers until the connection ends.
async fn read_loop<S>(mut read: SplitStream<WebSocketStream<S>>, pending: PendingMap)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Binary(data)) => match MashupResponse::decode(&data[..]) {
                Ok(response) => {
                    let waiter = pending.lock().await.waiters.remove(&response.request_id);
                    match waiter {
                        Some(waiter) => {
                            let _ = waiter.send(response);
                        }
                        None => warn!(
                            "Dropping response for unknown request {}",
                            response.request_id
                        ),
                    }
                }
                Err(e) => error!("Failed to decode response frame: {e}"),
            },
            Ok(Message::Close(_)) => {
                info!("Peer closed the connection");
                break;
            }
            Ok(Message::Text(_)) => warn!("Ignoring text frame; protocol is binary only"),
            Ok(_) => {}
            Err(e) => {
                warn!("Connection read failed: {e}");
                break;
            }
        }
    }

    // Dropping the senders wakes every waiter with a closed error.
    let mut pending = pending.lock().await;
    pending.closed = true;
    pending.waiters.clear();
}
