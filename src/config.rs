//! Configuration for the cloud ingestion daemon.
//!
//! Follows the optional-JSON-file-plus-env-overrides pattern: an
//! `EDGEWATCH_CONFIG` file supplies defaults, `EDGEWATCH_*` variables
//! override it, and validation happens once at load. The edge daemon is
//! configured through its own env-backed CLI arguments instead.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::store::{EventStore, MemoryEventStore, SqliteEventStore, EVENT_LOG_CAPACITY};

const DEFAULT_API_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_DB_PATH: &str = "edgewatch.db";

#[derive(Debug, Deserialize, Default)]
struct IngestConfigFile {
    api: Option<ApiConfigFile>,
    store: Option<StoreConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct StoreConfigFile {
    backend: Option<String>,
    db_path: Option<String>,
    capacity: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(anyhow!(
                "unknown store backend '{}': expected 'memory' or 'sqlite'",
                other
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub db_path: String,
    pub capacity: usize,
}

impl StoreSettings {
    /// Open the configured backend behind the one store interface.
    pub fn open(&self) -> Result<Arc<dyn EventStore>> {
        match self.backend {
            StoreBackend::Memory => Ok(Arc::new(MemoryEventStore::with_capacity(self.capacity))),
            StoreBackend::Sqlite => Ok(Arc::new(SqliteEventStore::open_with_capacity(
                &self.db_path,
                self.capacity,
            )?)),
        }
    }
}

/// Cloud ingestion daemon configuration.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub api_addr: String,
    pub store: StoreSettings,
}

impl IngestConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("EDGEWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(Path::new(path))?,
            None => IngestConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: IngestConfigFile) -> Result<Self> {
        let api_addr = file
            .api
            .and_then(|api| api.addr)
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());
        let store_file = file.store.unwrap_or_default();
        let backend = match store_file.backend.as_deref() {
            Some(raw) => raw.parse()?,
            None => StoreBackend::Memory,
        };
        Ok(Self {
            api_addr,
            store: StoreSettings {
                backend,
                db_path: store_file
                    .db_path
                    .unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
                capacity: store_file.capacity.unwrap_or(EVENT_LOG_CAPACITY),
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(addr) = env_nonempty("EDGEWATCH_API_ADDR") {
            self.api_addr = addr;
        }
        if let Some(backend) = env_nonempty("EDGEWATCH_STORE") {
            self.store.backend = backend.parse()?;
        }
        if let Some(db_path) = env_nonempty("EDGEWATCH_DB_PATH") {
            self.store.db_path = db_path;
        }
        if let Some(capacity) = env_nonempty("EDGEWATCH_CAPACITY") {
            self.store.capacity = capacity
                .parse()
                .map_err(|_| anyhow!("EDGEWATCH_CAPACITY must be a positive integer"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.store.capacity == 0 {
            return Err(anyhow!("store capacity must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<IngestConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid config file {}", path.display()))
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
