use mashup_world::error::WorldError;
use mashup_world::logger::initialize as LoggerInitialize;
use mashup_world::world::WorldApiHandler;

use mashup_core::{MashupConfig, MashupServiceBuilder, start_mashup_server};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;

use log::info;

const APP_DIR_NAME: &str = "mashup-world";

#[tokio::main]
async fn main() -> Result<(), WorldError> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME);

    create_dir_all(&log_dir).map_err(|e| WorldError::World {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;
    info!("World mashup starting");

    // Optional config file path as the only argument; env overrides it
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = MashupConfig::resolve(config_path.as_deref())?;
    let identity = config.server_identity()?;

    let handler = Arc::new(WorldApiHandler::new());
    let service = MashupServiceBuilder::from_config(&config)
        .with_handler(handler)
        .build()?;

    let handle = start_mashup_server(&config.bind_address(), identity, service.clone()).await?;
    info!("World mashup serving on {}", handle.local_addr());

    service.wait_for_handshake().await;
    info!("Handshake complete");

    service.wait_for_shutdown_request().await;
    info!("Shutdown requested");

    // The lifecycle hook ends the process; keep serving until it does so
    // the shutdown ack can flush.
    handle.stopped().await;
    Ok(())
}
