//! The in-flight conversation: the live message stream for a chat that may
//! not have been promoted to a durable session yet.

mod events;
mod stream;

pub use events::ConversationEvent;

use crate::provider::{ChatMessage, ChatRequest, CompletionApi, Role, registry};
use std::sync::Arc;
use std::time::Duration;
use stream::StreamEnd;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Default minimum interval between delta notifications.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(100);

/// Outcome of one assistant turn.
///
/// Only `Completed` counts as the stream-complete signal that promotion
/// listens for; stopped and failed turns never trigger it.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    Completed(ChatMessage),
    Stopped,
    Failed(String),
}

/// The live conversation being composed.
///
/// Tracks the growing message list, a loading flag while a stream is in
/// flight, and whether the conversation has been promoted to a durable
/// session yet. Failures in the stream are handled here: partial content
/// is kept, the controller returns to idle, and the caller sees the
/// outcome rather than an error.
pub struct Conversation {
    api: Arc<dyn CompletionApi>,
    model_label: String,
    messages: Vec<ChatMessage>,
    loading: bool,
    promoted: bool,
    throttle: Duration,
    abort_token: CancellationToken,
}

impl Conversation {
    pub fn new(api: Arc<dyn CompletionApi>, model_label: impl Into<String>) -> Self {
        Self {
            api,
            model_label: model_label.into(),
            messages: Vec::new(),
            loading: false,
            promoted: false,
            throttle: DEFAULT_THROTTLE,
            abort_token: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_promoted(&self) -> bool {
        self.promoted
    }

    pub(crate) fn mark_promoted(&mut self) {
        self.promoted = true;
    }

    /// Human-readable label of the selected model.
    pub fn model_label(&self) -> &str {
        &self.model_label
    }

    /// Wire-level model id, falling back to the label itself for models the
    /// registry does not know.
    pub fn model_id(&self) -> &str {
        registry::model_id_for(&self.model_label).unwrap_or(&self.model_label)
    }

    /// Provider identifier for provenance stamping. Unknown model labels
    /// resolve to an empty string; that fallback is deliberate.
    pub fn provider_id(&self) -> &str {
        registry::provider_for(&self.model_label).unwrap_or("")
    }

    pub fn set_model(&mut self, label: impl Into<String>) {
        self.model_label = label.into();
    }

    /// Handle the UI can use to stop the current (or next) turn.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.abort_token.clone()
    }

    /// Cancel the in-flight stream. Partial content already received stays
    /// in the message list; a subsequent `append` works immediately.
    pub fn stop(&self) {
        self.abort_token.cancel();
    }

    /// Send a user message and stream the assistant reply.
    ///
    /// Suspends until the stream completes, fails, or is stopped.
    pub async fn append(
        &mut self,
        text: impl Into<String>,
        tx: &mpsc::Sender<ConversationEvent>,
    ) -> TurnOutcome {
        let user = ChatMessage::new(
            Role::User,
            text,
            self.model_label.clone(),
            self.provider_id().to_string(),
        );
        self.messages.push(user);
        self.run_turn(tx).await
    }

    /// Discard the trailing assistant message and re-request a reply for
    /// the same prior context.
    pub async fn reload(&mut self, tx: &mpsc::Sender<ConversationEvent>) -> TurnOutcome {
        if self
            .messages
            .last()
            .is_some_and(|m| m.role == Role::Assistant)
        {
            self.messages.pop();
        }
        self.run_turn(tx).await
    }

    async fn run_turn(&mut self, tx: &mpsc::Sender<ConversationEvent>) -> TurnOutcome {
        // A cancelled token belongs to an earlier, stopped turn.
        if self.abort_token.is_cancelled() {
            self.abort_token = CancellationToken::new();
        }

        let request = ChatRequest {
            model: self.model_id().to_string(),
            messages: self.messages.clone(),
        };

        self.loading = true;
        let (text, end) =
            stream::stream_turn(&self.api, request, self.throttle, self.abort_token.clone(), tx)
                .await;
        self.loading = false;

        let provider = self.provider_id().to_string();
        match end {
            StreamEnd::Completed => {
                let message =
                    ChatMessage::new(Role::Assistant, text, self.model_label.clone(), provider);
                self.messages.push(message.clone());
                let _ = tx.send(ConversationEvent::Completed(message.clone())).await;
                TurnOutcome::Completed(message)
            }
            StreamEnd::Stopped => {
                if !text.is_empty() {
                    self.messages.push(ChatMessage::new(
                        Role::Assistant,
                        text,
                        self.model_label.clone(),
                        provider,
                    ));
                }
                let _ = tx.send(ConversationEvent::Stopped).await;
                TurnOutcome::Stopped
            }
            StreamEnd::Failed(e) => {
                warn!("Stream failed: {e}");
                if !text.is_empty() {
                    self.messages.push(ChatMessage::new(
                        Role::Assistant,
                        text,
                        self.model_label.clone(),
                        provider,
                    ));
                }
                let _ = tx.send(ConversationEvent::Failed(e.clone())).await;
                TurnOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderError, StreamEvent};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Turn {
        Reply(Vec<&'static str>),
        Fail(&'static str),
        /// Send the deltas, then never finish.
        Hang(Vec<&'static str>),
    }

    struct FakeApi {
        turns: Mutex<VecDeque<Turn>>,
    }

    impl FakeApi {
        fn new(turns: Vec<Turn>) -> Arc<Self> {
            Arc::new(Self {
                turns: Mutex::new(turns.into()),
            })
        }
    }

    #[async_trait]
    impl CompletionApi for FakeApi {
        async fn stream(
            &self,
            _request: ChatRequest,
            tx: mpsc::Sender<StreamEvent>,
        ) -> Result<(), ProviderError> {
            let turn = self
                .turns
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Turn::Reply(vec![]));
            match turn {
                Turn::Reply(deltas) => {
                    for delta in deltas {
                        let _ = tx.send(StreamEvent::Delta(delta.to_string())).await;
                    }
                    let _ = tx.send(StreamEvent::Done).await;
                    Ok(())
                }
                Turn::Fail(message) => {
                    let _ = tx.send(StreamEvent::Error(message.to_string())).await;
                    Err(ProviderError::Stream(message.to_string()))
                }
                Turn::Hang(deltas) => {
                    for delta in deltas {
                        let _ = tx.send(StreamEvent::Delta(delta.to_string())).await;
                    }
                    futures::future::pending::<()>().await;
                    Ok(())
                }
            }
        }
    }

    fn channel() -> (
        mpsc::Sender<ConversationEvent>,
        mpsc::Receiver<ConversationEvent>,
    ) {
        mpsc::channel(256)
    }

    fn drain(rx: &mut mpsc::Receiver<ConversationEvent>) -> Vec<ConversationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_append_completes_and_accumulates() {
        let api = FakeApi::new(vec![Turn::Reply(vec!["Hi ", "there"])]);
        let mut conversation = Conversation::new(api, "OpenAI: GPT-4o-mini");
        let (tx, mut rx) = channel();

        let outcome = conversation.append("Hello", &tx).await;

        let TurnOutcome::Completed(reply) = outcome else {
            panic!("Expected completion");
        };
        assert_eq!(reply.content, "Hi there");
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.provider, "openai");

        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.messages()[0].content, "Hello");
        assert_eq!(conversation.messages()[0].role, Role::User);
        assert!(!conversation.is_loading());

        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(ConversationEvent::Completed(_))));
    }

    #[tokio::test]
    async fn test_unknown_model_stamps_empty_provider() {
        let api = FakeApi::new(vec![Turn::Reply(vec!["ok"])]);
        let mut conversation = Conversation::new(api, "Custom: Mystery Model");
        let (tx, _rx) = channel();

        conversation.append("Hello", &tx).await;
        assert_eq!(conversation.messages()[0].provider, "");
        // Unregistered labels pass through as the wire model id.
        assert_eq!(conversation.model_id(), "Custom: Mystery Model");
    }

    #[tokio::test]
    async fn test_deltas_are_batched_under_throttle() {
        let api = FakeApi::new(vec![Turn::Reply(vec!["a", "b", "c", "d"])]);
        let mut conversation =
            Conversation::new(api, "OpenAI: GPT-4o-mini").with_throttle(Duration::from_secs(5));
        let (tx, mut rx) = channel();

        conversation.append("Hello", &tx).await;

        let deltas: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                ConversationEvent::Delta(text) => Some(text),
                _ => None,
            })
            .collect();
        // Everything arrives inside one throttle window: one flushed batch.
        assert_eq!(deltas, vec!["abcd".to_string()]);
    }

    #[tokio::test]
    async fn test_zero_throttle_emits_per_delta() {
        let api = FakeApi::new(vec![Turn::Reply(vec!["a", "b", "c"])]);
        let mut conversation =
            Conversation::new(api, "OpenAI: GPT-4o-mini").with_throttle(Duration::ZERO);
        let (tx, mut rx) = channel();

        conversation.append("Hello", &tx).await;

        let deltas = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, ConversationEvent::Delta(_)))
            .count();
        assert_eq!(deltas, 3);
    }

    #[tokio::test]
    async fn test_stop_keeps_partial_content_without_completion() {
        let api = FakeApi::new(vec![Turn::Hang(vec!["Hi ", "th"])]);
        let mut conversation = Conversation::new(api, "OpenAI: GPT-4o-mini");
        let (tx, mut rx) = channel();
        let cancel = conversation.cancel_handle();

        let (outcome, ()) = tokio::join!(conversation.append("Hello", &tx), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        assert!(matches!(outcome, TurnOutcome::Stopped));
        assert!(!conversation.is_loading());

        let last = conversation.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "Hi th");

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .all(|e| !matches!(e, ConversationEvent::Completed(_))));
        assert!(matches!(events.last(), Some(ConversationEvent::Stopped)));
    }

    #[tokio::test]
    async fn test_append_works_after_stop() {
        let api = FakeApi::new(vec![Turn::Reply(vec!["recovered"])]);
        let mut conversation = Conversation::new(api, "OpenAI: GPT-4o-mini");
        let (tx, _rx) = channel();

        // Stop with nothing in flight, then append: the stale cancelled
        // token must not poison the next turn.
        conversation.stop();
        let outcome = conversation.append("Hello", &tx).await;

        assert!(matches!(outcome, TurnOutcome::Completed(_)));
        assert_eq!(conversation.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_stream_keeps_partial_and_does_not_complete() {
        let api = FakeApi::new(vec![Turn::Fail("boom")]);
        let mut conversation = Conversation::new(api, "OpenAI: GPT-4o-mini");
        let (tx, mut rx) = channel();

        let outcome = conversation.append("Hello", &tx).await;

        let TurnOutcome::Failed(message) = outcome else {
            panic!("Expected failure");
        };
        assert_eq!(message, "boom");
        assert!(!conversation.is_loading());
        // No tokens arrived, so no assistant message was added.
        assert_eq!(conversation.messages().len(), 1);

        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(ConversationEvent::Failed(_))));
    }

    #[tokio::test]
    async fn test_reload_replaces_last_assistant_turn() {
        let api = FakeApi::new(vec![
            Turn::Reply(vec!["first reply"]),
            Turn::Reply(vec!["second reply"]),
        ]);
        let mut conversation = Conversation::new(api, "OpenAI: GPT-4o-mini");
        let (tx, _rx) = channel();

        conversation.append("Hello", &tx).await;
        let outcome = conversation.reload(&tx).await;

        assert!(matches!(outcome, TurnOutcome::Completed(_)));
        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.messages()[1].content, "second reply");
    }
}
