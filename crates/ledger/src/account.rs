//! User accounts (cash, cards, …) and their service contract.
//!
//! Account ids are sequential `i64` because they must round-trip through
//! compact callback payloads like `proceed_account_date:<id>:<date>`.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicI64, Ordering},
    },
};

use serde::{Deserialize, Serialize};

use crate::{LedgerError, user::UserService};

pub const DEFAULT_CURRENCY: &str = "PLN";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Cash,
    Card,
    Credit,
    CryptoWallet,
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub kind: AccountKind,
    /// ISO 4217 code, uppercase.
    pub currency: String,
    /// Chat id of the owning user.
    pub owner: i64,
    /// Archived accounts are hidden from pickers but kept for history.
    pub archived: bool,
}

impl Account {
    /// Label used on buttons and summaries, e.g. `Cash (PLN)`.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.currency)
    }
}

pub trait AccountService: Send + Sync {
    fn list_by_owner(&self, owner: i64, include_archived: bool) -> Vec<Account>;

    fn find_by_id(&self, id: i64) -> Result<Account, LedgerError>;

    fn find_by_name_and_owner(&self, name: &str, owner: i64) -> Option<Account>;

    /// First active account of the owner, creating a cash account named after
    /// the user when none exists yet.
    fn find_or_create_default(&self, owner: i64) -> Result<Account, LedgerError>;

    fn create(
        &self,
        owner: i64,
        name: &str,
        kind: AccountKind,
        currency: &str,
    ) -> Result<Account, LedgerError>;

    fn archive(&self, id: i64) -> Result<(), LedgerError>;

    fn unarchive(&self, id: i64) -> Result<(), LedgerError>;
}

/// In-memory account registry.
#[derive(Clone)]
pub struct InMemoryAccounts {
    inner: Arc<Mutex<HashMap<i64, Account>>>,
    next_id: Arc<AtomicI64>,
    users: Arc<dyn UserService>,
}

impl InMemoryAccounts {
    pub fn new(users: Arc<dyn UserService>) -> Self {
        Self {
            inner: Arc::default(),
            next_id: Arc::new(AtomicI64::new(1)),
            users,
        }
    }
}

impl AccountService for InMemoryAccounts {
    fn list_by_owner(&self, owner: i64, include_archived: bool) -> Vec<Account> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut accounts: Vec<Account> = guard
            .values()
            .filter(|a| a.owner == owner && (include_archived || !a.archived))
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.id);
        accounts
    }

    fn find_by_id(&self, id: i64) -> Result<Account, LedgerError> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("account {id}")))
    }

    fn find_by_name_and_owner(&self, name: &str, owner: i64) -> Option<Account> {
        let needle = name.trim().to_lowercase();
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .values()
            .find(|a| a.owner == owner && a.name.to_lowercase() == needle)
            .cloned()
    }

    fn find_or_create_default(&self, owner: i64) -> Result<Account, LedgerError> {
        if let Some(first) = self.list_by_owner(owner, false).into_iter().next() {
            return Ok(first);
        }
        let user = self.users.find(owner)?;
        let name = format!("{}'s CASH account", user.display_name());
        self.create(owner, &name, AccountKind::Cash, DEFAULT_CURRENCY)
    }

    fn create(
        &self,
        owner: i64,
        name: &str,
        kind: AccountKind,
        currency: &str,
    ) -> Result<Account, LedgerError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidInput("blank account name".to_string()));
        }
        let code = currency.trim().to_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LedgerError::InvalidInput(format!(
                "currency must be 3 letters ISO 4217, got \"{currency}\""
            )));
        }
        self.users.find(owner)?;

        let account = Account {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            name: trimmed.to_string(),
            kind,
            currency: code,
            owner,
            archived: false,
        };
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(account.id, account.clone());
        Ok(account)
    }

    fn archive(&self, id: i64) -> Result<(), LedgerError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let account = guard
            .get_mut(&id)
            .ok_or_else(|| LedgerError::NotFound(format!("account {id}")))?;
        account.archived = true;
        Ok(())
    }

    fn unarchive(&self, id: i64) -> Result<(), LedgerError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let account = guard
            .get_mut(&id)
            .ok_or_else(|| LedgerError::NotFound(format!("account {id}")))?;
        account.archived = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::InMemoryUsers;

    fn accounts_with_user(chat_id: i64) -> InMemoryAccounts {
        let users = Arc::new(InMemoryUsers::new());
        users
            .create(Some("ivan"), Some("Иван"), None, chat_id)
            .unwrap();
        InMemoryAccounts::new(users)
    }

    #[test]
    fn default_account_created_on_demand() {
        let accounts = accounts_with_user(10);
        let account = accounts.find_or_create_default(10).unwrap();
        assert_eq!(account.name, "Иван's CASH account");
        assert_eq!(account.kind, AccountKind::Cash);
        assert_eq!(account.currency, "PLN");

        // Second call returns the same account instead of creating another.
        let again = accounts.find_or_create_default(10).unwrap();
        assert_eq!(again.id, account.id);
    }

    #[test]
    fn archived_accounts_hidden_from_active_list() {
        let accounts = accounts_with_user(10);
        let a = accounts.create(10, "PKO", AccountKind::Card, "pln").unwrap();
        assert_eq!(a.currency, "PLN");
        accounts.archive(a.id).unwrap();
        assert!(accounts.list_by_owner(10, false).is_empty());
        assert_eq!(accounts.list_by_owner(10, true).len(), 1);
    }

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        let accounts = accounts_with_user(10);
        accounts.create(10, "PKO", AccountKind::Card, "PLN").unwrap();
        assert!(accounts.find_by_name_and_owner("pko", 10).is_some());
        assert!(accounts.find_by_name_and_owner("pko", 11).is_none());
    }

    #[test]
    fn rejects_bad_currency() {
        let accounts = accounts_with_user(10);
        assert!(matches!(
            accounts.create(10, "X", AccountKind::Other, "PLNX"),
            Err(LedgerError::InvalidInput(_))
        ));
    }
}
