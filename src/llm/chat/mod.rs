pub mod anthropic;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::{ LlmConfig, LlmError };
use self::anthropic::AnthropicChatClient;
use crate::models::chat::Conversation;

/// One call to the completion API: a system prompt kept out of the
/// conversation plus the messages themselves.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Conversation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub response: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client = AnthropicChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
