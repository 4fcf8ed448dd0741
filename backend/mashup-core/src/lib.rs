pub mod auth;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod ipc;
pub mod lifecycle;
pub mod proto;
pub mod service;
pub mod session;
pub mod tls;

#[cfg(test)]
mod tests;

pub use config::MashupConfig;
pub use context::MashupContext;
pub use error::{CoreError, HandlerError, SessionError};
pub use handler::MashupApiHandler;
pub use ipc::{MashupPeerClient, MashupServerHandle, start_mashup_server};
pub use lifecycle::{ProcessExitHook, ShutdownHook};
pub use service::{MashupService, MashupServiceBuilder};
