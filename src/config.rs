//! Application configuration loaded from `config/config.yaml`.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! runnable in-memory setup. The one value that must be overridden outside of
//! development is `security.secret`.

use crate::security::{DEFAULT_RENEW_THRESHOLD, DEFAULT_TOKEN_LIFETIME};
use crate::store::{MemoryStore, SharedStore, SqliteStore};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Secret used when none is configured. Development only.
pub const DEV_SECRET: &str = "objrouter-dev-secret";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub store: StoreConfig,
    pub apis: ApiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// HMAC secret for security tokens
    pub secret: String,
    pub token_lifetime_secs: u64,
    /// Tokens with less than this left are renewed
    pub renew_threshold_secs: u64,
    /// Name of the token argument and cookie
    pub cookie_name: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret: DEV_SECRET.to_string(),
            token_lifetime_secs: DEFAULT_TOKEN_LIFETIME.as_secs(),
            renew_threshold_secs: DEFAULT_RENEW_THRESHOLD.as_secs(),
            cookie_name: crate::dispatcher::DEFAULT_TOKEN_COOKIE.to_string(),
        }
    }
}

impl SecurityConfig {
    #[must_use]
    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_secs)
    }

    #[must_use]
    pub fn renew_threshold(&self) -> Duration {
        Duration::from_secs(self.renew_threshold_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database file; required for the `sqlite` backend
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Open the configured document store.
    pub fn open(&self) -> Result<SharedStore> {
        match self.backend {
            StoreBackend::Memory => {
                info!("Using in-memory document store");
                Ok(Arc::new(MemoryStore::new()))
            }
            StoreBackend::Sqlite => {
                let path = self
                    .path
                    .as_deref()
                    .context("store.path is required for the sqlite backend")?;
                if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                    std::fs::create_dir_all(dir)
                        .with_context(|| format!("failed to create {}", dir.display()))?;
                }
                let store = SqliteStore::open(path)
                    .with_context(|| format!("failed to open sqlite store {}", path.display()))?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Amount granted once per user by `IssueTestTokens`; 0 disables it
    pub issue_test_tokens: u64,
}

impl AppConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("invalid configuration")
    }

    /// Load from `path`, or use defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            warn!("No configuration file given, using defaults");
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        info!(
            path = %path.display(),
            addr = %config.server.addr,
            backend = ?config.store.backend,
            "Configuration loaded"
        );
        if config.security.secret == DEV_SECRET {
            warn!("Using the development token secret");
        }
        Ok(config)
    }

    /// Refuse to listen beyond loopback while tokens are signed with
    /// [`DEV_SECRET`], since anyone could mint an admin token with it.
    pub fn check_bind(&self) -> Result<()> {
        if self.security.secret != DEV_SECRET {
            return Ok(());
        }
        let addrs: Vec<_> = self
            .server
            .addr
            .to_socket_addrs()
            .with_context(|| format!("invalid listen address {}", self.server.addr))?
            .collect();
        if let Some(open) = addrs.iter().find(|a| !a.ip().is_loopback()) {
            bail!(
                "refusing to listen on {open} with the development token secret; \
                 set security.secret or OBJR_SECRET"
            );
        }
        Ok(())
    }
}
