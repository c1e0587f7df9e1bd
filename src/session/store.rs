//! Durable persistence for the active transcript and bounded history.
//!
//! Persistence is a convenience, never a correctness requirement: every
//! storage failure is swallowed, logged, and degrades to "no persisted
//! data". The conversation itself always proceeds.

use super::{Message, Sender};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Storage key for the active transcript.
pub const ACTIVE_KEY: &str = "ulap-chat-messages";
/// Storage key for the archived-session list.
pub const HISTORY_KEY: &str = "ulap-chat-history";

/// History never grows past this many archived sessions.
pub const HISTORY_LIMIT: usize = 50;

const TITLE_MAX_CHARS: usize = 40;

/// One archived conversation. Immutable after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: i64,
}

/// String-valued key/value storage, the per-origin storage analog. All
/// operations are infallible at this seam; implementations swallow and log
/// their own failures.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// File-backed storage: one file per key under a base directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.key_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(error) = fs::write(self.key_path(key), value) {
            warn!(key, %error, "storage write failed");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.key_path(key);
        if path.exists() {
            if let Err(error) = fs::remove_file(&path) {
                warn!(key, %error, "storage remove failed");
            }
        }
    }
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

/// Transcript and history persistence over a [`KeyValueStore`].
pub struct ChatStore<S: KeyValueStore> {
    storage: S,
}

impl<S: KeyValueStore> ChatStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Loads the persisted active transcript. Empty or unparsable storage
    /// reads as `None`, never as an error.
    pub fn load_active(&self) -> Option<Vec<Message>> {
        let raw = self.storage.get(ACTIVE_KEY)?;
        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) if messages.is_empty() => None,
            Ok(messages) => Some(messages),
            Err(error) => {
                warn!(%error, "discarding unparsable active transcript");
                None
            }
        }
    }

    /// Persists the active transcript. An empty transcript clears the key
    /// entirely; an empty array is never written.
    pub fn save_active(&self, messages: &[Message]) {
        if messages.is_empty() {
            self.storage.remove(ACTIVE_KEY);
            return;
        }
        match serde_json::to_string(messages) {
            Ok(json) => self.storage.set(ACTIVE_KEY, &json),
            Err(error) => warn!(%error, "failed to serialize active transcript"),
        }
    }

    /// Archived sessions, most recent first.
    pub fn list_history(&self) -> Vec<SessionRecord> {
        let Some(raw) = self.storage.get(HISTORY_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(history) => history,
            Err(error) => {
                warn!(%error, "discarding unparsable history");
                Vec::new()
            }
        }
    }

    /// Archives the given transcript at the head of the history list.
    ///
    /// A transcript without a user-authored turn is not archived; the call
    /// is a no-op and the history is returned unchanged.
    pub fn archive_current(&self, messages: &[Message]) -> Vec<SessionRecord> {
        let Some(first_user) = messages.iter().find(|m| m.sender == Sender::Me) else {
            return self.list_history();
        };

        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            title: derive_title(&first_user.text),
            messages: messages.to_vec(),
            created_at: Utc::now().timestamp_millis(),
        };

        let mut history = self.list_history();
        history.insert(0, record);
        history.truncate(HISTORY_LIMIT);
        self.persist_history(&history);
        history
    }

    pub fn delete_history_entry(&self, id: &str) -> Vec<SessionRecord> {
        let mut history = self.list_history();
        history.retain(|record| record.id != id);
        self.persist_history(&history);
        history
    }

    fn persist_history(&self, history: &[SessionRecord]) {
        match serde_json::to_string(history) {
            Ok(json) => self.storage.set(HISTORY_KEY, &json),
            Err(error) => warn!(%error, "failed to serialize history"),
        }
    }
}

/// Derives a display title from the first user message: strips a leading
/// command marker, capitalizes, and truncates to 40 chars with an ellipsis.
fn derive_title(text: &str) -> String {
    let trimmed = text.trim();
    let stripped = trimmed.strip_prefix('/').unwrap_or(trimmed).trim_start();

    let mut chars = stripped.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => return "Conversation".to_string(),
    };

    if capitalized.chars().count() > TITLE_MAX_CHARS {
        let head: String = capitalized.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        capitalized
    }
}
