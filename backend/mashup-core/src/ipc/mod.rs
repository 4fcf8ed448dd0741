//! WebSocket RPC layer.
//!
//! Both directions of the collaboration speak the same protocol: binary
//! WebSocket frames carrying protobuf [`MashupRequest`](crate::proto::MashupRequest)
//! and [`MashupResponse`](crate::proto::MashupResponse) envelopes, correlated
//! by `request_id`.
//!
//! - [`start_mashup_server`] serves the mashup's endpoint (plain or TLS).
//!   Every request is handled on its own task, so slow handler calls do not
//!   hold up other requests on the same connection.
//! - [`MashupPeerClient`] is the calling side. The handshake uses it for the
//!   reverse channel back to the host; hosts and tests use it to drive a
//!   mashup.

mod client;
mod frame;
mod handle;
mod server;

pub use client::{DEFAULT_REQUEST_TIMEOUT, MashupPeerClient};
pub use frame::websocket_config;
pub use handle::MashupServerHandle;
pub use server::start_mashup_server;
