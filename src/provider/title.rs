//! Title-derivation client.
//!
//! The service takes the opening exchange of a conversation and returns a
//! short human-readable label for it.

use crate::provider::client::WireMessage;
use crate::provider::error::Error;
use crate::provider::http::HttpClient;
use crate::provider::types::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Fallback when the service succeeds without returning a title.
pub(crate) const DEFAULT_TITLE: &str = "New Chat";

/// The title-derivation service.
#[async_trait]
pub trait TitleApi: Send + Sync {
    /// Derive a title from the opening messages of a conversation.
    ///
    /// A response carrying an error field is a failure, not a degraded
    /// success.
    async fn derive_title(&self, context: &[ChatMessage]) -> Result<String, Error>;
}

#[derive(Debug, Serialize)]
struct TitleRequest {
    messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct TitleResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn map_response(response: TitleResponse) -> Result<String, Error> {
    if let Some(error) = response.error {
        return Err(Error::Title(error));
    }
    Ok(response.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()))
}

/// HTTP client for `POST /title`.
#[derive(Debug)]
pub struct HttpTitleClient {
    http: HttpClient,
}

impl HttpTitleClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(base_url, api_key),
        }
    }
}

#[async_trait]
impl TitleApi for HttpTitleClient {
    async fn derive_title(&self, context: &[ChatMessage]) -> Result<String, Error> {
        // The first two messages are enough context for a label.
        let body = TitleRequest {
            messages: WireMessage::from_history(&context[..context.len().min(2)]),
        };
        let response: TitleResponse = self.http.post_json("/title", &body).await?;
        map_response(response)
    }
}
