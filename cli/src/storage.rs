//! File-backed session storage.
//!
//! The session keys live in one small JSON object on disk. Every call reads
//! the file fresh, so two CLI invocations never disagree about the session.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use session::{SessionStorage, StorageError};

const STATE_DIR: &str = ".account-portal";
const STATE_FILE: &str = "session.json";

/// `$HOME/.account-portal/session.json`, or a relative path without `HOME`.
pub fn default_state_file() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(STATE_DIR)
        .join(STATE_FILE)
}

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// Current entries. A missing file is empty; a malformed one is treated
    /// as empty and replaced on the next write.
    fn read_entries(&self) -> BTreeMap<String, String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read session file");
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "session file is malformed; ignoring");
            BTreeMap::new()
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            };
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(entries).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, raw)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_entries().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries();
        entries.insert(key.to_owned(), value.to_owned());
        self.write_entries(&entries)
            .map_err(|e| StorageError::Write { key: key.to_owned(), reason: e.to_string() })
    }

    fn remove(&self, key: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries();
        if entries.remove(key).is_none() {
            return;
        }
        if let Err(e) = self.write_entries(&entries) {
            tracing::warn!(path = %self.path.display(), key, error = %e, "failed to update session file");
        }
    }
}
