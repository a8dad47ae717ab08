//! Session persistence over a key-value storage slot.
//!
//! The whole store serializes to one snapshot per mutation: either the new
//! snapshot replaces the old one or the old one stays intact, so a crash
//! between the in-memory change and the write is never observable as a
//! half-applied state.

use crate::provider::ChatMessage;
use crate::session::Session;
use crate::storage::{Storage, StorageError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Storage namespace owned by this store. Any other persisted store must
/// pick a different namespace; a shared slot would overwrite this one.
pub const SESSIONS_NAMESPACE: &str = "sessions";

/// Title given to sessions created without one.
pub const DEFAULT_TITLE: &str = "New Chat";

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    sessions: &'a [Session],
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    sessions: Vec<Session>,
}

/// The durable list of chat sessions.
///
/// Mutations on an id the store does not hold are silent no-ops; callers
/// that need to distinguish should check [`SessionStore::get_session`]
/// first. Deleting an absent id is likewise a no-op.
pub struct SessionStore {
    sessions: Vec<Session>,
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    /// Open the store, rehydrating from storage.
    ///
    /// A never-written slot yields an empty store; a snapshot written by a
    /// different schema version is an error rather than silent corruption.
    pub fn open(storage: Arc<dyn Storage>) -> Result<Self, SessionStoreError> {
        let sessions = match storage.read(SESSIONS_NAMESPACE)? {
            Some(raw) => {
                let snapshot: Snapshot = serde_json::from_str(&raw)?;
                if snapshot.version != SCHEMA_VERSION {
                    return Err(SessionStoreError::SchemaVersion {
                        found: snapshot.version,
                        expected: SCHEMA_VERSION,
                    });
                }
                snapshot.sessions
            }
            None => Vec::new(),
        };

        Ok(Self { sessions, storage })
    }

    /// Persist the whole store as one snapshot.
    ///
    /// Runs after the in-memory mutation; on failure the in-memory state
    /// stays authoritative and the previously persisted snapshot is intact.
    fn persist(&self) -> Result<(), SessionStoreError> {
        let raw = serde_json::to_string(&SnapshotRef {
            version: SCHEMA_VERSION,
            sessions: &self.sessions,
        })?;
        self.storage.write(SESSIONS_NAMESPACE, &raw)?;
        Ok(())
    }

    /// Create a session with the default title and return its id.
    pub fn create_session(
        &mut self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, SessionStoreError> {
        self.create_session_titled(model, DEFAULT_TITLE, messages)
    }

    /// Create a session with the given title and return its id.
    ///
    /// Promotion passes the derived title here so the new session is never
    /// observable without one.
    pub fn create_session_titled(
        &mut self,
        model: &str,
        title: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, SessionStoreError> {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions.push(Session {
            id: id.clone(),
            title: title.to_string(),
            model: model.to_string(),
            messages,
            created_at: now,
            updated_at: now,
        });
        self.persist()?;
        Ok(id)
    }

    /// Replace a session's messages (and model, if given).
    pub fn update_session(
        &mut self,
        id: &str,
        messages: Vec<ChatMessage>,
        model: Option<&str>,
    ) -> Result<(), SessionStoreError> {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            debug!(id, "update_session on unknown id, ignoring");
            return Ok(());
        };
        session.messages = messages;
        if let Some(model) = model {
            session.model = model.to_string();
        }
        session.updated_at = Utc::now();
        self.persist()
    }

    /// Delete a session. Idempotent.
    pub fn delete_session(&mut self, id: &str) -> Result<(), SessionStoreError> {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            return Ok(());
        }
        self.persist()
    }

    /// Pure lookup, no side effects.
    pub fn get_session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// All sessions, in insertion order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Append one message to a session.
    pub fn add_message(
        &mut self,
        id: &str,
        message: ChatMessage,
    ) -> Result<(), SessionStoreError> {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            debug!(id, "add_message on unknown id, ignoring");
            return Ok(());
        };
        session.messages.push(message);
        session.updated_at = Utc::now();
        self.persist()
    }

    /// Replace a session's title.
    pub fn update_title(&mut self, id: &str, title: &str) -> Result<(), SessionStoreError> {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            debug!(id, "update_title on unknown id, ignoring");
            return Ok(());
        };
        session.title = title.to_string();
        session.updated_at = Utc::now();
        self.persist()
    }

    /// Empty the store.
    pub fn clear_all(&mut self) -> Result<(), SessionStoreError> {
        self.sessions.clear();
        self.persist()
    }
}
