//! edgewatch_api - cloud-side event ingestion service
//!
//! This daemon:
//! 1. Opens the configured event store backend (memory or SQLite)
//! 2. Serves the events API (POST /events, GET /events, GET /health)
//! 3. Runs until terminated externally

use anyhow::Result;
use std::sync::mpsc;

use edgewatch::api::{ApiConfig, ApiServer};
use edgewatch::config::IngestConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = IngestConfig::load()?;
    let store = config.store.open()?;

    let api_config = ApiConfig {
        addr: config.api_addr.clone(),
    };
    let api_handle = ApiServer::new(api_config, store).spawn()?;
    log::info!("ingest api listening on {}", api_handle.addr);
    log::info!(
        "event store: {:?} capacity={} db_path={}",
        config.store.backend,
        config.store.capacity,
        config.store.db_path
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    log::info!("edgewatch_api waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping ingest api...");
    api_handle.stop()?;

    Ok(())
}
