//! Persisted session record.
//!
//! # Design
//! The session is mirrored to a small TOML file holding exactly the four
//! `Session` fields. The file is rewritten whole on every save and a load is
//! only usable when access token, refresh token, and user id are all
//! non-empty — anything else reads as "no session", never as a partially
//! populated one.
//!
//! The store is a single-writer resource: concurrent saves against the same
//! path must be serialized by the owning process.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::session::Session;

const DEFAULT_FILE: &str = "supabase_session.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionRecord {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    email: String,
}

/// Load/save/clear handle for the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Conventional location: `supabase_session.toml` in the working
    /// directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the persisted record with `session`, creating the file if
    /// needed.
    pub fn save(&self, session: &Session) -> io::Result<()> {
        let record = SessionRecord {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            user_id: session.user_id.clone(),
            email: session.email.clone(),
        };
        let text = toml::to_string(&record).map_err(io::Error::other)?;
        fs::write(&self.path, text)?;
        tracing::debug!(path = %self.path.display(), "session persisted");
        Ok(())
    }

    /// Read back the persisted session.
    ///
    /// An absent file, an unreadable record, or any empty mandatory field
    /// yields `None`.
    pub fn load(&self) -> Option<Session> {
        let text = fs::read_to_string(&self.path).ok()?;
        let record: SessionRecord = match toml::from_str(&text) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "unreadable session record: {err}");
                return None;
            }
        };
        if record.access_token.is_empty()
            || record.refresh_token.is_empty()
            || record.user_id.is_empty()
        {
            return None;
        }
        Some(Session {
            access_token: record.access_token,
            refresh_token: record.refresh_token,
            user_id: record.user_id,
            email: record.email,
        })
    }

    /// Delete the session file; succeeds when it is already absent.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}
