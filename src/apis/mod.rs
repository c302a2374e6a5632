//! # Built-in APIs
//!
//! Action tables shipped with the router:
//!
//! - `SystemInfo` (`system://Info`): `GetVersion`, `GetTime`
//! - `CollectionUsers` (`name://Users`): `CreateUser`, `FindUser`, `CountUsers`
//! - `User` (`name://Users/<username>`): password, login, role and wallet
//!   account actions
//! - `UserView`: the model rendered for `/view/name/Users/<username>/`
//!
//! Wallet actions talk to a [`Ledger`]; [`MemoryLedger`] is the in-process
//! implementation used by the server binary and tests.

mod credential;
mod ledger;
mod system;
mod users;

pub use credential::{PasswordCredential, CREDENTIALS_PROPERTY, PASSWORD_CREDENTIAL};
pub use ledger::{Ledger, MemoryLedger, SharedLedger};
pub use system::SYSTEM_INFO;
pub use users::{USERS_COLLECTION, USER_TYPE, USER_VIEW};

use crate::config::ApiConfig;
use crate::error::DispatchError;
use crate::registry::ActionRegistry;
use tracing::info;

/// Register every built-in action table.
pub fn register_builtin(
    registry: &mut ActionRegistry,
    config: &ApiConfig,
    ledger: SharedLedger,
) -> Result<(), DispatchError> {
    system::register(registry)?;
    users::register(registry, config, ledger)?;
    info!(
        actions = registry.len(),
        issue_test_tokens = config.issue_test_tokens,
        "Built-in APIs registered"
    );
    Ok(())
}
