use crate::provider::ChatMessage;

/// Notifications emitted toward the UI while a turn is in flight.
///
/// Delta batches are throttled: at most one per throttle interval while
/// tokens arrive, plus a final flush when the stream settles. The UI
/// redraws per event, not per token.
#[derive(Debug, Clone)]
pub enum ConversationEvent {
    /// Assistant text accumulated since the previous event.
    Delta(String),
    /// A turn ran to completion with this assistant message.
    Completed(ChatMessage),
    /// The stream was stopped; partial content stays in the message list.
    Stopped,
    /// The stream failed; partial content stays in the message list.
    Failed(String),
}
