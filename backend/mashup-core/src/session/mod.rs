//! Connection configuration store.
//!
//! Holds the three connection configs a mashup process cares about:
//!
//! - the **handshake** config: bootstrap credential plus the address the
//!   mashup serves on, fixed at startup
//! - the **session** config: the credential minted by a successful handshake
//! - the **peer** config: where the host listens and the credential the
//!   mashup presents when it calls back
//!
//! The session and peer configs only ever change together, through the
//! store actor, so a reader never observes one without the other. The
//! handshake updates them under the context's commit lock, together with
//! the reverse-channel link.

mod connection_config;
mod store;

pub use connection_config::ConnectionConfig;
pub use store::{ConnectionStore, SessionState, StoreCommand};
