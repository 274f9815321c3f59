//! Session history persisted as a single JSON array, most recent first.
//!
//! Writes are atomic (temp file + rename). A missing file is an empty
//! history; a corrupt one is logged and treated as empty.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::SearchSession;

const HISTORY_FILENAME: &str = "history.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize sessions: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    limit: usize,
}

impl SessionStore {
    /// Store rooted at `dir`, keeping at most `limit` sessions (minimum 1).
    pub fn new(dir: impl AsRef<Path>, limit: usize) -> Self {
        Self {
            path: dir.as_ref().join(HISTORY_FILENAME),
            limit: limit.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recent sessions, most recent first, never more than the bound.
    pub fn list(&self) -> Vec<SearchSession> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read session history");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<SearchSession>>(&raw) {
            Ok(mut sessions) => {
                self.normalize(&mut sessions);
                sessions
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session history is corrupt, ignoring");
                Vec::new()
            }
        }
    }

    pub fn get(&self, timestamp: i64) -> Option<SearchSession> {
        self.list().into_iter().find(|s| s.timestamp == timestamp)
    }

    /// Inserts `session`, replacing any entry with the same timestamp.
    pub fn save(&self, session: SearchSession) -> Result<Vec<SearchSession>, StoreError> {
        let mut sessions = self.list();
        sessions.retain(|s| s.timestamp != session.timestamp);
        let timestamp = session.timestamp;
        sessions.push(session);
        self.normalize(&mut sessions);
        self.write(&sessions)?;
        debug!(timestamp, count = sessions.len(), "session saved");
        Ok(sessions)
    }

    /// Removes the session with `timestamp`. Absent timestamps leave history untouched.
    pub fn delete(&self, timestamp: i64) -> Result<Vec<SearchSession>, StoreError> {
        let mut sessions = self.list();
        let before = sessions.len();
        sessions.retain(|s| s.timestamp != timestamp);
        if sessions.len() != before {
            self.write(&sessions)?;
            debug!(timestamp, "session deleted");
        }
        Ok(sessions)
    }

    fn normalize(&self, sessions: &mut Vec<SearchSession>) {
        sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sessions.truncate(self.limit);
    }

    fn write(&self, sessions: &[SearchSession]) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(sessions)?;
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, json).map_err(io_err)?;
        fs::rename(&temp, &self.path).map_err(io_err)?;
        Ok(())
    }
}
