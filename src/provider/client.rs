//! Streaming completion client for OpenAI-compatible endpoints.

use crate::provider::error::Error;
use crate::provider::http::HttpClient;
use crate::provider::sse::SseParser;
use crate::provider::types::{ChatMessage, ChatRequest, StreamEvent};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// The streaming completion service.
///
/// Sends the message history and streams assistant tokens back over `tx`,
/// terminating with `Done` on success or `Error` on failure.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn stream(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), Error>;
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

impl WireMessage {
    pub(crate) fn from_history(messages: &[ChatMessage]) -> Vec<Self> {
        messages
            .iter()
            .map(|m| Self {
                role: m.role.as_str(),
                content: m.content.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    #[serde(default)]
    delta: WireDelta,
}

#[derive(Debug, Default, Deserialize)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the text delta from one SSE data payload, if any.
fn parse_delta(data: &str) -> Result<Option<String>, Error> {
    let chunk: WireChunk =
        serde_json::from_str(data).map_err(|e| Error::Malformed(format!("{e}: {data}")))?;
    Ok(chunk
        .choices
        .into_iter()
        .find_map(|c| c.delta.content)
        .filter(|text| !text.is_empty()))
}

/// HTTP client for `POST /chat/completions` streaming.
#[derive(Debug)]
pub struct HttpCompletionClient {
    http: HttpClient,
}

impl HttpCompletionClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(base_url, api_key),
        }
    }
}

#[async_trait]
impl CompletionApi for HttpCompletionClient {
    async fn stream(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), Error> {
        let body = WireRequest {
            model: request.model,
            messages: WireMessage::from_history(&request.messages),
            stream: true,
        };

        let stream = self.http.post_stream("/chat/completions", &body).await?;
        futures::pin_mut!(stream);

        let mut parser = SseParser::new();
        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                    return Err(Error::Stream(e.to_string()));
                }
            };

            for data in parser.feed(&String::from_utf8_lossy(&bytes)) {
                if data == "[DONE]" {
                    let _ = tx.send(StreamEvent::Done).await;
                    return Ok(());
                }
                match parse_delta(&data) {
                    Ok(Some(text)) => {
                        let _ = tx.send(StreamEvent::Delta(text)).await;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                        return Err(e);
                    }
                }
            }
        }

        let _ = tx.send(StreamEvent::Done).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::types::Role;

    #[test]
    fn test_parse_delta_openai_chunk() {
        let data = r#"{"choices":[{"delta":{"content":"Hi"}}]}"#;
        assert_eq!(parse_delta(data).unwrap().as_deref(), Some("Hi"));
    }

    #[test]
    fn test_parse_delta_empty_content_skipped() {
        let data = r#"{"choices":[{"delta":{"content":""}}]}"#;
        assert!(parse_delta(data).unwrap().is_none());
    }

    #[test]
    fn test_parse_delta_role_only_chunk() {
        // The first chunk of a stream usually carries the role, no content.
        let data = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert!(parse_delta(data).unwrap().is_none());
    }

    #[test]
    fn test_parse_delta_malformed() {
        assert!(matches!(parse_delta("not json"), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_wire_messages_carry_roles() {
        let history = vec![
            ChatMessage::new(Role::User, "Hello", "m", "p"),
            ChatMessage::new(Role::Assistant, "Hi", "m", "p"),
        ];
        let wire = WireMessage::from_history(&history);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "user");
        assert_eq!(wire[1].role, "assistant");
        assert_eq!(wire[1].content, "Hi");
    }
}
