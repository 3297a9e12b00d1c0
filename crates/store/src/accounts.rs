use chrono::{SecondsFormat, Utc};
use models::{Account, Theme, Trade};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::storage::KeyValueStore;

pub const ACCOUNTS_KEY: &str = "accounts";
pub const THEME_KEY: &str = "theme";

/// Key under which an account's trade collection is stored.
pub fn trades_key(account_id: &str) -> String {
    format!("trades_{}", account_id)
}

/// Accounts and their trade collections on top of a [`KeyValueStore`].
///
/// Every mutation reads the current value, computes the new one in memory and
/// writes it with a single `set`, so a failure leaves the stored state untouched.
#[derive(Debug)]
pub struct AccountStore<S> {
    store: S,
}

impl<S: KeyValueStore> AccountStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw)
    }

    /// Accounts in creation order, empty if none were ever created.
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.read_json(ACCOUNTS_KEY)?.unwrap_or_default())
    }

    pub fn find_account(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.list_accounts()?.into_iter().find(|a| a.id == id))
    }

    /// Creates and persists a new account. The name is stored trimmed.
    pub fn create_account(&mut self, name: &str) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }

        let mut accounts = self.list_accounts()?;
        let account = Account {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        accounts.push(account.clone());
        self.write_json(ACCOUNTS_KEY, &accounts)?;

        tracing::info!(account_id = %account.id, name = %account.name, "Account created");
        Ok(account)
    }

    /// Removes the account and its whole trade collection. Returns the removed account.
    ///
    /// The account list is written first. If removing the trade collection then fails,
    /// the deletion still succeeds and the orphaned `trades_<id>` key is logged.
    pub fn delete_account(&mut self, id: &str) -> Result<Account> {
        let mut accounts = self.list_accounts()?;
        let pos = accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| StoreError::AccountNotFound(id.to_string()))?;

        let removed = accounts.remove(pos);
        self.write_json(ACCOUNTS_KEY, &accounts)?;
        if let Err(e) = self.store.remove(&trades_key(id)) {
            tracing::warn!(
                account_id = %id,
                error = %e,
                "Account deleted but its trades could not be removed"
            );
        }

        tracing::info!(account_id = %id, name = %removed.name, "Account deleted with its trades");
        Ok(removed)
    }

    /// Stored trades for one account; an account without uploads has none.
    pub fn trades(&self, account_id: &str) -> Result<Vec<Trade>> {
        let trades: Vec<Trade> = self.read_json(&trades_key(account_id))?.unwrap_or_default();
        tracing::debug!(account_id, count = trades.len(), "Loaded trades");
        Ok(trades)
    }

    /// Overwrites the account's trade collection.
    pub fn replace_trades(&mut self, account_id: &str, trades: &[Trade]) -> Result<()> {
        self.write_json(&trades_key(account_id), trades)?;
        tracing::info!(account_id, count = trades.len(), "Trade collection replaced");
        Ok(())
    }

    /// Trades of every account, concatenated in account order.
    pub fn all_trades(&self) -> Result<Vec<Trade>> {
        let mut all = Vec::new();
        for account in self.list_accounts()? {
            all.extend(self.trades(&account.id)?);
        }
        Ok(all)
    }

    /// Selected theme; absent or unknown ids fall back to the default theme.
    pub fn theme(&self) -> Result<Theme> {
        let Some(raw) = self.store.get(THEME_KEY)? else {
            return Ok(Theme::default());
        };
        Ok(raw.parse().unwrap_or_else(|_| {
            tracing::warn!(theme = %raw, "Unknown stored theme, using default");
            Theme::default()
        }))
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.store.set(THEME_KEY, theme.id().to_string())
    }
}
