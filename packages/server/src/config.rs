//! Server configuration
//!
//! Read once at startup from `HORIZON_*` environment variables.

use anyhow::{anyhow, Context, Result};
use horizon_core::services::MissingNodePolicy;
use horizon_core::GraphConfig;
use std::env;
use std::path::PathBuf;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3001;

/// Where the graph store keeps its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Embedded in-memory engine, discarded on exit
    Memory,
    /// Embedded SurrealKV engine at the given path
    Disk(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreLocation,
    pub graph: GraphConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment
    ///
    /// - `HORIZON_HOST` (default `127.0.0.1`)
    /// - `HORIZON_PORT` (default `3001`)
    /// - `HORIZON_DB_PATH`: `memory`, or a database path
    ///   (default `~/.horizon/database/horizon.db`)
    /// - `HORIZON_SYNC_MISSING_NODES`: `retain` (default) or `deactivate`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("HORIZON_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("HORIZON_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("Invalid HORIZON_PORT: {}", raw))?,
            None => DEFAULT_PORT,
        };

        let store = match lookup("HORIZON_DB_PATH") {
            Some(raw) if raw.eq_ignore_ascii_case("memory") => StoreLocation::Memory,
            Some(raw) => StoreLocation::Disk(PathBuf::from(raw)),
            None => StoreLocation::Disk(default_db_path()?),
        };

        let mut graph = GraphConfig::default();
        if let Some(raw) = lookup("HORIZON_SYNC_MISSING_NODES") {
            let policy = raw
                .parse::<MissingNodePolicy>()
                .map_err(|e| anyhow!("Invalid HORIZON_SYNC_MISSING_NODES: {}", e))?;
            graph = graph.with_missing_node_policy(policy);
        }

        Ok(Self {
            host,
            port,
            store,
            graph,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_db_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| anyhow!("Failed to get home directory"))?;

    Ok(home_dir
        .join(".horizon")
        .join("database")
        .join("horizon.db"))
}
