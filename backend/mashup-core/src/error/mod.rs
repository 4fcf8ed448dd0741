pub mod config;
pub mod handler;
pub mod ipc;
pub mod session;
pub mod tls;

pub use config::ConfigError;
pub use handler::HandlerError;
pub use ipc::IpcError;
pub use session::SessionError;
pub use tls::TlsError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Ipc(#[from] IpcError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
