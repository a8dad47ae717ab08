//! External chat collaborators: the streaming completion service, the
//! title-derivation service, and the static model registry.

mod client;
mod error;
mod http;
pub mod registry;
mod sse;
mod title;
mod types;

pub use client::{CompletionApi, HttpCompletionClient};
pub use error::Error as ProviderError;
pub use http::HttpClient;
pub use sse::SseParser;
pub use title::{HttpTitleClient, TitleApi};
pub use types::{ChatMessage, ChatRequest, Role, StreamEvent};
