pub mod anthropic;
pub mod gemini;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use timekeeper_shared::Tool;

use crate::config::{Config, ProviderKind};
use crate::error::{AgentError, ConfigError, Result};
use crate::{ContentBlock, Message, ToolCall};

pub use anthropic::Anthropic;
pub use gemini::Gemini;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other(String),
}

/// One assistant turn as returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

impl ModelReply {
    pub fn text(&self) -> String {
        crate::join_text(&self.content)
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolCall(call) => Some(call),
            _ => None,
        })
    }
}

/// A remote chat-completion API that understands tool calling.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, history: &[Message], tools: &[Tool]) -> Result<ModelReply>;
}

pub fn from_config(config: &Config) -> Result<Box<dyn ChatProvider>, ConfigError> {
    let client = Client::builder()
        .user_agent(concat!("timekeeper/", env!("CARGO_PKG_VERSION")))
        .timeout(config.timeout)
        .build()?;

    Ok(match config.provider {
        ProviderKind::Anthropic => Box::new(Anthropic::new(client, config)),
        ProviderKind::Gemini => Box::new(Gemini::new(client, config)),
    })
}

/// Sends a prepared request and decodes a successful JSON body. Non-2xx
/// statuses become `AgentError::Api` carrying the provider's own message.
pub(crate) async fn post_json<R: DeserializeOwned>(request: RequestBuilder) -> Result<R> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AgentError::Api {
            status: status.as_u16(),
            message: extract_error_message(&body),
        });
    }

    Ok(response.json::<R>().await?)
}

/// Both vendors wrap failures as `{"error": {"message": "..."}}`.
pub(crate) fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
