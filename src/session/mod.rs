mod store;

pub use store::{DEFAULT_TITLE, SESSIONS_NAMESPACE, SessionStore, SessionStoreError};

use crate::provider::ChatMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A durable conversation record.
///
/// `messages` is conversation-ordered and append-only in normal operation;
/// full replacement is permitted via [`SessionStore::update_session`] for
/// edit and regenerate flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
