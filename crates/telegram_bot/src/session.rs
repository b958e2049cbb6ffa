//! Per-chat conversation state with a sliding expiry.
//!
//! Sessions live in memory behind a mutex and are mirrored to a JSON file on
//! every write, so a restart picks the conversations back up. A session that
//! has not been touched for the TTL is dropped on the next read.

use std::{
    collections::HashMap,
    fs,
    io::Write as _,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use ledger::{Account, Category, MoneyCents};
use serde::{Deserialize, Serialize};

/// Where a conversation currently is. Absence of a session means idle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogState {
    #[default]
    Idle,
    AwaitingAmount,
    AwaitingExpenseCategory,
    AwaitingIncomeSource,
    AwaitingAccountAndDate,
    AwaitingDescription,
    AwaitingConfirmation,
    AwaitingFastExpense,
    AwaitingCategoryClarification,
    AwaitingStatsPeriod,
}

/// Everything collected so far for one chat's in-flight operation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Session {
    pub state: DialogState,
    pub amount: Option<MoneyCents>,
    pub category: Option<Category>,
    pub account: Option<Account>,
    pub date: Option<NaiveDate>,
    pub comment: Option<String>,
    pub is_expense: bool,
    pub is_income: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredSession {
    #[serde(flatten)]
    session: Session,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    sessions: HashMap<String, StoredSession>,
}

#[derive(Clone)]
pub struct SessionStore {
    path: Option<PathBuf>,
    ttl: TimeDelta,
    inner: Arc<Mutex<SessionFile>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(TimeDelta::hours(12))
    }

    pub fn with_ttl(ttl: TimeDelta) -> Self {
        Self {
            path: None,
            ttl,
            inner: Arc::new(Mutex::new(SessionFile::default())),
        }
    }

    /// Opens the store backed by `path`, starting empty if the file is
    /// missing or unreadable.
    pub fn load_or_empty(path: PathBuf, ttl: TimeDelta) -> Self {
        let file = read_json_file(&path).unwrap_or_default();
        Self {
            path: Some(path),
            ttl,
            inner: Arc::new(Mutex::new(file)),
        }
    }

    /// Returns the live session for a chat, dropping it if it expired.
    pub fn get(&self, chat_id: i64) -> Option<Session> {
        let mut file = self.lock();
        let key = chat_id.to_string();
        match file.sessions.get(&key) {
            Some(stored) if Utc::now() - stored.last_updated < self.ttl => {
                Some(stored.session.clone())
            }
            Some(_) => {
                file.sessions.remove(&key);
                self.persist(&file);
                None
            }
            None => None,
        }
    }

    /// Stores a session and refreshes its expiry.
    pub fn put(&self, chat_id: i64, session: Session) {
        let mut file = self.lock();
        file.sessions.insert(
            chat_id.to_string(),
            StoredSession {
                session,
                last_updated: Utc::now(),
            },
        );
        self.persist(&file);
    }

    pub fn delete(&self, chat_id: i64) {
        let mut file = self.lock();
        if file.sessions.remove(&chat_id.to_string()).is_some() {
            self.persist(&file);
        }
    }

    /// Current state for a chat, if any conversation is in flight.
    pub fn state_of(&self, chat_id: i64) -> Option<DialogState> {
        self.get(chat_id).map(|s| s.state)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionFile> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, file: &SessionFile) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = write_json_file(path, file) {
            tracing::warn!(path = %path.display(), error = %err, "failed to persist sessions");
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read_json_file(path: &Path) -> Option<SessionFile> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(file) => Some(file),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring corrupt session file");
            None
        }
    }
}

fn write_json_file(path: &Path, file: &SessionFile) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut out = fs::File::create(&tmp)?;
        serde_json::to_writer_pretty(&mut out, file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        out.flush()?;
    }
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store = SessionStore::new();
        let session = Session {
            state: DialogState::AwaitingAmount,
            is_expense: true,
            ..Default::default()
        };
        store.put(7, session);

        let loaded = store.get(7).unwrap();
        assert_eq!(loaded.state, DialogState::AwaitingAmount);
        assert!(loaded.is_expense);
    }

    #[test]
    fn expired_sessions_are_dropped_on_read() {
        let store = SessionStore::with_ttl(TimeDelta::zero());
        store.put(7, Session::default());
        assert!(store.get(7).is_none());
    }

    #[test]
    fn delete_removes_the_session() {
        let store = SessionStore::new();
        store.put(7, Session::default());
        store.delete(7);
        assert!(store.get(7).is_none());
    }

    #[test]
    fn state_of_absent_chat_is_none() {
        let store = SessionStore::new();
        assert_eq!(store.state_of(42), None);
    }
}
