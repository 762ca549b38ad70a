//! Local cache of previous logins.
//!
//! Sessions are persisted as a flat JSON array. Lookups are keyed by username and
//! return the most recently appended record; older records are kept as history.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{client::error::ClientError, constants::SESSION_TTL};

/// An authenticated session: a bearer token and the account it acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub access_token: String,
    pub id_account: String,
    /// Creation date, human readable
    pub date: String,
    /// Creation date as epoch milliseconds
    pub timestamp: i64,
}

impl Session {
    pub fn new(
        username: impl Into<String>,
        access_token: impl Into<String>,
        id_account: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            username: username.into(),
            access_token: access_token.into(),
            id_account: id_account.into(),
            date: created_at.to_rfc2822(),
            timestamp: created_at.timestamp_millis(),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// A session is fresh while it is less than two hours away from `now`, in either direction.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now.timestamp_millis().abs_diff(self.timestamp);
        u128::from(age) < SESSION_TTL.as_millis()
    }

    /// Token and account id must both be present for the session to be used.
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() && !self.id_account.is_empty()
    }
}

pub trait SessionStore: Send + Sync {
    /// Most recent session recorded for `username`, if any.
    fn load(&self, username: &str) -> Option<Session>;

    /// Record a new session and persist the whole list.
    fn append(&self, session: Session) -> Result<(), ClientError>;

    /// Most recent session for `username` if it is usable and fresh at `now`.
    fn fresh(&self, username: &str, now: DateTime<Utc>) -> Option<Session> {
        self.load(username)
            .filter(|session| session.is_usable() && session.is_fresh(now))
    }
}

/// Session store backed by a single JSON file, read once when opened.
pub struct JsonFileSessionStore {
    path: PathBuf,
    sessions: Mutex<Vec<Session>>,
    /// Held for the duration of a file write so snapshots land in append order.
    writer: Mutex<()>,
}

impl JsonFileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sessions = read_sessions(&path);
        debug!(path = %path.display(), count = sessions.len(), "Loaded session cache");
        Self {
            path,
            sessions: Mutex::new(sessions),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every recorded session, in append order.
    pub fn sessions(&self) -> Vec<Session> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for JsonFileSessionStore {
    fn load(&self, username: &str) -> Option<Session> {
        self.lock()
            .iter()
            .rev()
            .find(|session| session.username == username)
            .cloned()
    }

    fn append(&self, session: Session) -> Result<(), ClientError> {
        let _writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let snapshot = {
            let mut sessions = self.lock();
            sessions.push(session);
            sessions.clone()
        };

        if let Some(directory) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(directory)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&snapshot)?)?;
        debug!(path = %self.path.display(), count = snapshot.len(), "Session cache written");
        Ok(())
    }
}

/// Missing, unreadable or malformed files all read as an empty cache.
fn read_sessions(path: &Path) -> Vec<Session> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No session cache");
            return Vec::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed session cache");
            Vec::new()
        }
    }
}
