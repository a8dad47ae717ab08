//! One-shot promotion of an in-flight conversation to a durable session.
//!
//! When the first assistant reply completes, the seed exchange (first user
//! message plus the first assistant message) becomes a durable session:
//! a title is derived from the pair, the session is created already titled,
//! and the UI navigates to it. The promoted flag guarantees this happens
//! at most once per conversation.

use crate::conversation::Conversation;
use crate::provider::{ChatMessage, Role, TitleApi};
use crate::session::SessionStore;
use thiserror::Error;
use tracing::{info, warn};

/// UI navigation collaborator: jump to a session view by id.
pub trait Navigate {
    fn go_to_session(&self, id: &str);
}

#[derive(Debug, Error)]
pub enum PromotionError {
    #[error("Title derivation failed: {0}")]
    Title(#[from] crate::provider::ProviderError),

    #[error("Session store error: {0}")]
    Store(#[from] crate::session::SessionStoreError),
}

/// Outcome of a promotion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    /// A session was created and the UI navigated to it.
    Created(String),
    /// The guard rejected the attempt: already promoted, still streaming,
    /// or no settled seed exchange yet.
    Skipped,
}

/// Promote the conversation if it has a settled, never-promoted seed
/// exchange.
///
/// A title failure aborts the whole workflow: no session is created, no
/// navigation happens, and the conversation (promoted flag included) is
/// left untouched so the attempt can be retried.
pub async fn maybe_promote(
    conversation: &mut Conversation,
    store: &mut SessionStore,
    titles: &dyn TitleApi,
    navigator: &dyn Navigate,
) -> Result<Promotion, PromotionError> {
    if conversation.is_promoted() || conversation.is_loading() {
        return Ok(Promotion::Skipped);
    }
    let Some((seed_user, seed_assistant)) = seed_exchange(conversation.messages()) else {
        return Ok(Promotion::Skipped);
    };
    let seeds = vec![seed_user.clone(), seed_assistant.clone()];

    let title = match titles.derive_title(&seeds).await {
        Ok(title) => title,
        Err(e) => {
            warn!("Title derivation failed, conversation stays unpromoted: {e}");
            return Err(e.into());
        }
    };

    let id = store.create_session_titled(conversation.model_id(), &title, seeds)?;
    conversation.mark_promoted();
    info!(id = %id, title = %title, "Promoted conversation to session");
    navigator.go_to_session(&id);
    Ok(Promotion::Created(id))
}

/// The seed exchange: the first user message and the first assistant
/// message after it. Looked up by role, not by position, so a leading
/// system message or a retried turn cannot skew the pair.
fn seed_exchange(messages: &[ChatMessage]) -> Option<(&ChatMessage, &ChatMessage)> {
    let user_index = messages.iter().position(|m| m.role == Role::User)?;
    let assistant = messages[user_index + 1..]
        .iter()
        .find(|m| m.role == Role::Assistant)?;
    Some((&messages[user_index], assistant))
}
