//! The streaming loop for one assistant turn.

use crate::conversation::ConversationEvent;
use crate::provider::{ChatRequest, CompletionApi, StreamEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How one turn's stream ended.
#[derive(Debug)]
pub(crate) enum StreamEnd {
    Completed,
    Stopped,
    Failed(String),
}

/// Drive one completion stream to its end.
///
/// Returns the accumulated assistant text (possibly partial) and how the
/// stream ended. Delta notifications on `tx` are batched by `throttle`;
/// whatever is still pending is flushed before returning.
pub(crate) async fn stream_turn(
    api: &Arc<dyn CompletionApi>,
    request: ChatRequest,
    throttle: Duration,
    abort: CancellationToken,
    tx: &mpsc::Sender<ConversationEvent>,
) -> (String, StreamEnd) {
    let (stream_tx, mut stream_rx) = mpsc::channel(64);
    let api = api.clone();
    let handle = tokio::spawn(async move { api.stream(request, stream_tx).await });

    let mut text = String::new();
    let mut pending = String::new();
    let mut last_flush = Instant::now();

    let end = loop {
        tokio::select! {
            () = abort.cancelled() => {
                handle.abort();
                break StreamEnd::Stopped;
            }
            event = stream_rx.recv() => match event {
                Some(StreamEvent::Delta(delta)) => {
                    text.push_str(&delta);
                    pending.push_str(&delta);
                    if last_flush.elapsed() >= throttle {
                        let _ = tx
                            .send(ConversationEvent::Delta(std::mem::take(&mut pending)))
                            .await;
                        last_flush = Instant::now();
                    }
                }
                Some(StreamEvent::Done) => {}
                Some(StreamEvent::Error(e)) => {
                    handle.abort();
                    break StreamEnd::Failed(e);
                }
                None => {
                    // Channel closed: the provider task is done.
                    match handle.await {
                        Ok(Ok(())) => break StreamEnd::Completed,
                        Ok(Err(e)) => break StreamEnd::Failed(e.to_string()),
                        Err(join) if join.is_panic() => {
                            break StreamEnd::Failed("provider task panicked".to_string());
                        }
                        Err(_) => break StreamEnd::Stopped,
                    }
                }
            }
        }
    };

    if !pending.is_empty() {
        let _ = tx.send(ConversationEvent::Delta(pending)).await;
    }

    (text, end)
}
