//! Server settings from the environment and flow settings from disk.

use anyhow::{Context, Result};
use dirs::config_dir;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::db::Database;
use crate::models::FlowConfig;

const APP_NAME: &str = "confess";
const FLOW_FILE: &str = "flow.json";
const DEFAULT_PORT: u16 = 3000;

/// Settings for `confess serve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Database file; the platform data directory when unset.
    pub database_path: Option<PathBuf>,
    /// Base URL share links are built from.
    pub public_url: String,
}

impl ServerConfig {
    /// Load from `CONFESS_BIND`, `CONFESS_PORT`, `CONFESS_DB_PATH` and
    /// `CONFESS_PUBLIC_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind = lookup("CONFESS_BIND")
            .and_then(|s| s.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let port = lookup("CONFESS_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let database_path = lookup("CONFESS_DB_PATH").map(PathBuf::from);
        let public_url = lookup("CONFESS_PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        Self {
            bind,
            port,
            database_path,
            public_url,
        }
    }

    /// Override the port, keeping a derived public URL in step.
    pub fn with_port(mut self, port: u16) -> Self {
        if self.public_url == format!("http://localhost:{}", self.port) {
            self.public_url = format!("http://localhost:{}", port);
        }
        self.port = port;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn open_database(&self) -> Result<Database> {
        let db = match &self.database_path {
            Some(path) => Database::open(path.clone())?,
            None => Database::open_default()?,
        };
        db.migrate()?;
        Ok(db)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Load the flow configuration.
///
/// An explicit path must exist and parse. Without one, the user's
/// `confess/flow.json` is used when present, and the built-in preset
/// otherwise or when that file is unreadable.
pub fn load_flow_config(path: Option<&Path>) -> Result<FlowConfig> {
    if let Some(path) = path {
        return read_flow_config(path);
    }

    let Some(default_path) = flow_config_path() else {
        return Ok(FlowConfig::preset());
    };
    if !default_path.exists() {
        return Ok(FlowConfig::preset());
    }

    match read_flow_config(&default_path) {
        Ok(config) => Ok(config),
        Err(e) => {
            tracing::warn!("Failed to load flow config, using preset: {:#}", e);
            Ok(FlowConfig::preset())
        }
    }
}

pub fn save_flow_config(path: &Path, config: &FlowConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    let content =
        serde_json::to_string_pretty(config).context("Failed to serialize flow config")?;
    fs::write(path, content).context("Failed to write flow config")?;
    Ok(())
}

fn read_flow_config(path: &Path) -> Result<FlowConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read flow config {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse flow config {}", path.display()))
}

/// `{config_dir}/confess/flow.json`
pub fn flow_config_path() -> Option<PathBuf> {
    let mut path = config_dir()?;
    path.push(APP_NAME);
    path.push(FLOW_FILE);
    Some(path)
}
