//! Mashup WebSocket server.
//!
//! Serves the mashup's RPC endpoint. The server:
//!
//! - Binds to the configured address (loopback by default)
//! - Optionally terminates TLS with a [`ServerIdentity`]
//! - Decodes binary protobuf [`MashupRequest`] frames
//! - Handles every request on its own task and replies with the matching
//!   `request_id`
//!
//! Authentication is per request (every payload carries its credential), so
//! there is no connection-level handshake beyond the WebSocket upgrade.

use crate::error::ipc::IpcError;
use crate::ipc::frame::{encode_frame, error_response, websocket_config, write_loop};
use crate::ipc::handle::MashupServerHandle;
use crate::proto::MashupErrorCode::InvalidMessage;
use crate::proto::{MashupRequest, MashupResponse, mashup_request, mashup_response};
use crate::service::MashupService;
use crate::tls::ServerIdentity;

use common::ErrorLocation;

use std::net::SocketAddr;
use std::panic::Location;

use futures_util::StreamExt;
use log::{debug, error, info, warn};
use prost::Message as ProstMessage;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::sync::{broadcast, mpsc};
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::accept_async_with_config;
use tokio_tungstenite::tungstenite::Message;

const OUTBOUND_CAPACITY: usize = 64;

/// Starts the mashup server on `bind_addr`.
///
/// Binds immediately and spawns the accept loop in the background. Pass
/// port `0` to let the OS choose; the chosen address is available from
/// [`MashupServerHandle::local_addr`].
///
/// # Errors
///
/// Returns [`IpcError::Io`] if the address cannot be bound.
pub async fn start_mashup_server(
    bind_addr: &str,
    identity: Option<ServerIdentity>,
    service: MashupService,
) -> Result<MashupServerHandle, IpcError> {
    let listener = TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;
    service.record_local_addr(local_addr);
    let acceptor = identity.map(|identity| identity.acceptor());

    info!(
        "Mashup server listening on {} ({})",
        local_addr,
        if acceptor.is_some() { "wss" } else { "ws" }
    );

    let (stop_tx, mut stop_rx) = broadcast::channel(1);
    let connection_stop = stop_tx.clone();

    let task = TokioSpawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("Client connecting from {}", addr);
                        TokioSpawn(serve_connection(
                            stream,
                            addr,
                            acceptor.clone(),
                            service.clone(),
                            connection_stop.subscribe(),
                        ));
                    }
                    Err(e) => {
                        error!("Accept failed, stopping server: {e}");
                        break;
                    }
                },
                _ = stop_rx.recv() => {
                    info!("Mashup server on {} stopped accepting", local_addr);
                    break;
                }
            }
        }
    });

    Ok(MashupServerHandle {
        local_addr,
        stop: stop_tx,
        task,
    })
}

async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    acceptor: Option<TlsAcceptor>,
    service: MashupService,
    stop: broadcast::Receiver<()>,
) {
    let result = match acceptor {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(tls) => handle_connection(tls, addr, service, stop).await,
            Err(e) => Err(IpcError::Handshake {
                message: format!("TLS handshake with {addr} failed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        },
        None => handle_connection(stream, addr, service, stop).await,
    };

    if let Err(e) = result {
        error!("Connection {addr} ended with error: {e}");
    }
}

/// Serves one WebSocket connection until the client leaves or the server
/// stops.
///
/// Requests are dispatched concurrently; replies go through a single writer
/// task. On exit the writer drains every reply still in flight before the
/// socket is closed.
///
/// # Errors
///
/// - [`IpcError::Handshake`] - WebSocket upgrade failed
/// - [`IpcError::Read`] - the socket failed mid-stream
async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    service: MashupService,
    mut stop: broadcast::Receiver<()>,
) -> Result<(), IpcError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ws_stream = accept_async_with_config(
        stream,
        Some(websocket_config(service.max_message_size())),
    )
    .await
    .map_err(|e| IpcError::Handshake {
        message: format!("WebSocket handshake failed: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let (write, mut read) = ws_stream.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let writer = TokioSpawn(write_loop(write, outbound_rx));
    let mut result = Ok(());

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Binary(data))) => match MashupRequest::decode(&data[..]) {
                    Ok(request) => {
                        let service = service.clone();
                        let outbound = outbound_tx.clone();
                        TokioSpawn(async move {
                            let response = handle_message(&service, request).await;
                            send_response(&outbound, &response).await;
                        });
                    }
                    Err(e) => {
                        warn!("Undecodable frame from {addr}: {e}");
                        let response = error_response(0, InvalidMessage, format!("Failed to decode request: {e}"));
                        send_response(&outbound_tx, &response).await;
                    }
                },
                Some(Ok(Message::Text(_))) => {
                    warn!("Text frame from {addr}; protocol is binary only");
                    let response = error_response(0, InvalidMessage, "Text frames are not supported");
                    send_response(&outbound_tx, &response).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client {addr} disconnected");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    result = Err(IpcError::Read {
                        message: format!("Read from {addr} failed: {e}"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                    break;
                }
            },
            _ = stop.recv() => {
                info!("Closing connection {addr}: server stopping");
                let _ = outbound_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    drop(outbound_tx);
    let _ = writer.await;
    result
}

/// Route one request to the service and build its reply.
async fn handle_message(service: &MashupService, request: MashupRequest) -> MashupResponse {
    let request_id = request.request_id;

    let Some(payload) = request.payload else {
        warn!("Request {request_id} had no payload");
        return error_response(request_id, InvalidMessage, "No payload in message");
    };

    let operation = payload.operation();
    debug!("Handling {operation} (request {request_id})");

    let result = match payload {
        mashup_request::Payload::CollaborateInit(req) => service
            .collaborate_init(req)
            .await
            .map(mashup_response::Payload::ConnectionConfigs),
        mashup_request::Payload::Shutdown(req) => service
            .shutdown(req)
            .await
            .map(mashup_response::Payload::Empty),
        mashup_request::Payload::GetElements(req) => service
            .get_elements(req)
            .await
            .map(mashup_response::Payload::DetailedElementBundle),
        mashup_request::Payload::UpsertElements(req) => service
            .upsert_elements(req)
            .await
            .map(mashup_response::Payload::DetailedElementBundle),
        mashup_request::Payload::TweakStates(req) => service
            .tweak_states(req)
            .await
            .map(mashup_response::Payload::ElementStateBundle),
        mashup_request::Payload::TweakStatesByMotiv(req) => service
            .tweak_states_by_motiv(req)
            .await
            .map(mashup_response::Payload::Empty),
        mashup_request::Payload::OnDisplayChange(req) => service
            .on_display_change(req)
            .await
            .map(mashup_response::Payload::DisplayHint),
    };

    match result {
        Ok(payload) => MashupResponse {
            request_id,
            payload: Some(payload),
        },
        Err(e) => {
            warn!("{operation} (request {request_id}) failed: {e}");
            error_response(request_id, e.code(), e.message())
        }
    }
}

async fn send_response(outbound: &mpsc::Sender<Message>, response: &MashupResponse) {
    match encode_frame(response) {
        Ok(frame) => {
            if outbound.send(frame).await.is_err() {
                warn!(
                    "Connection gone before response to request {} was sent",
                    response.request_id
                );
            }
        }
        Err(e) => error!("Failed to encode response: {e}"),
    }
}
