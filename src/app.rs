//! Wiring: configuration in, ready [`Dispatcher`] out.

use crate::apis::{register_builtin, SharedLedger};
use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::registry::ActionRegistry;
use crate::security::SecurityTokenManager;
use crate::store::SharedStore;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Token manager configured from `config.security`.
#[must_use]
pub fn token_manager(config: &AppConfig) -> SecurityTokenManager {
    SecurityTokenManager::new(&config.security.secret)
        .lifetime(config.security.token_lifetime())
        .renew_threshold(config.security.renew_threshold())
}

/// Build a dispatcher with the built-in APIs over `store`.
pub fn build_dispatcher(
    config: &AppConfig,
    store: SharedStore,
    ledger: SharedLedger,
) -> Result<Dispatcher> {
    let mut registry = ActionRegistry::new();
    register_builtin(&mut registry, &config.apis, ledger)
        .context("failed to register built-in APIs")?;
    Ok(Dispatcher::new(store, Arc::new(registry), Arc::new(token_manager(config)))
        .with_token_cookie(config.security.cookie_name.clone()))
}
