use crate::error::DispatchError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Wallet ledger backing user accounts.
///
/// The production ledger lives outside this process; the router only needs
/// these three calls.
pub trait Ledger: Send + Sync {
    /// Open a new account and return its id.
    fn new_account(&self) -> Result<String, DispatchError>;

    /// Current balance of `account`.
    fn balance(&self, account: &str) -> Result<u64, DispatchError>;

    /// Credit `amount` to `account`, returning the new balance.
    fn issue(&self, account: &str, amount: u64) -> Result<u64, DispatchError>;
}

pub type SharedLedger = Arc<dyn Ledger>;

/// In-process ledger for development and tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: RwLock<HashMap<String, u64>>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for MemoryLedger {
    fn new_account(&self) -> Result<String, DispatchError> {
        let account = format!("acct_{}", ulid::Ulid::new());
        self.accounts.write().insert(account.clone(), 0);
        info!(account = %account, "Ledger account opened");
        Ok(account)
    }

    fn balance(&self, account: &str) -> Result<u64, DispatchError> {
        self.accounts
            .read()
            .get(account)
            .copied()
            .ok_or_else(|| DispatchError::ObjectNotFound(account.to_string()))
    }

    fn issue(&self, account: &str, amount: u64) -> Result<u64, DispatchError> {
        let mut accounts = self.accounts.write();
        let balance = accounts
            .get_mut(account)
            .ok_or_else(|| DispatchError::ObjectNotFound(account.to_string()))?;
        *balance = balance.saturating_add(amount);
        info!(account, amount, "Tokens issued");
        Ok(*balance)
    }
}
