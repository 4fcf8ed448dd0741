//! Protobuf framing helpers shared by server and client.

use crate::error::ipc::IpcError;
use crate::proto::{MashupErrorCode, MashupErrorResponse, MashupResponse, mashup_response};

use common::ErrorLocation;

use std::panic::Location;

use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt};
use log::warn;
use prost::Message as ProstMessage;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

/// WebSocket limits for a given maximum protobuf message size.
pub fn websocket_config(max_message_size: usize) -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(max_message_size))
        .max_frame_size(Some(max_message_size))
}

/// Encode a protobuf message into a binary WebSocket frame.
#[track_caller]
pub(crate) fn encode_frame<M: ProstMessage>(message: &M) -> Result<Message, IpcError> {
    let mut buf = Vec::with_capacity(message.encoded_len());
    message
        .encode(&mut buf)
        .map_err(|e| IpcError::ProtobufEncode {
            message: format!("Failed to encode frame: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(Message::Binary(buf.into()))
}

/// Error reply for a request.
pub(crate) fn error_response(
    request_id: u64,
    code: MashupErrorCode,
    message: impl Into<String>,
) -> MashupResponse {
    MashupResponse {
        request_id,
        payload: Some(mashup_response::Payload::Error(MashupErrorResponse {
            code: code as i32,
            message: message.into(),
        })),
    }
}

/// Drain outbound frames into the socket until every sender is gone or a
/// close frame has been written.
pub(crate) async fn write_loop<S>(
    mut write: SplitSink<S, Message>,
    mut outbound: mpsc::Receiver<Message>,
) where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(frame) = outbound.recv().await {
        let closing = matches!(frame, Message::Close(_));

        if let Err(e) = write.send(frame).await {
            warn!("Failed to write frame: {e}");
            break;
        }

        if closing {
            break;
        }
    }

    let _ = write.close().await;
}
