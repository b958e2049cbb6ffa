//! Bot users, keyed by chat id.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};

use crate::LedgerError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// Best available human name: first name, then username, then the id.
    pub fn display_name(&self) -> String {
        self.first_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| self.chat_id.to_string())
    }
}

pub trait UserService: Send + Sync {
    fn exists(&self, chat_id: i64) -> bool;

    fn create(
        &self,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        chat_id: i64,
    ) -> Result<User, LedgerError>;

    fn find(&self, chat_id: i64) -> Result<User, LedgerError>;
}

#[derive(Clone, Default)]
pub struct InMemoryUsers {
    inner: Arc<Mutex<HashMap<i64, User>>>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserService for InMemoryUsers {
    fn exists(&self, chat_id: i64) -> bool {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.contains_key(&chat_id)
    }

    fn create(
        &self,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        chat_id: i64,
    ) -> Result<User, LedgerError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if guard.contains_key(&chat_id) {
            return Err(LedgerError::ExistingKey(format!("user {chat_id}")));
        }
        let clean = |s: Option<&str>| {
            s.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let user = User {
            chat_id,
            username: clean(username),
            first_name: clean(first_name),
            last_name: clean(last_name),
        };
        guard.insert(chat_id, user.clone());
        Ok(user)
    }

    fn find(&self, chat_id: i64) -> Result<User, LedgerError> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .get(&chat_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("user {chat_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_find() {
        let users = InMemoryUsers::new();
        users.create(Some("ivan"), Some("Иван"), Some(" "), 42).unwrap();
        let user = users.find(42).unwrap();
        assert_eq!(user.display_name(), "Иван");
        assert_eq!(user.last_name, None);
        assert!(users.exists(42));
        assert!(matches!(
            users.create(None, None, None, 42),
            Err(LedgerError::ExistingKey(_))
        ));
    }

    #[test]
    fn missing_user_is_not_found() {
        let users = InMemoryUsers::new();
        assert!(matches!(users.find(1), Err(LedgerError::NotFound(_))));
    }
}
