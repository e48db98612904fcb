use crate::cli::ServeArgs;
use crate::config::prompt::resolve_system_prompt;
use crate::llm::{ LlmConfig, LlmError };
use crate::llm::chat::{ ChatClient, CompletionRequest, new_client as new_chat_client };
use crate::models::attachment::AttachedFile;
use crate::models::chat::{ ChatMessage, ContentBlock, Conversation, MessageContent, Role };

use futures::future::try_join_all;
use log::{ info, debug, warn };
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("conversation has no valid messages")]
    EmptyConversation,
    #[error("failed to encode attachment: {0}")]
    Encoding(String),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Stateless relay between the chat endpoint and the completion API.
#[derive(Clone)]
pub struct ChatAgent {
    chat_client: Arc<dyn ChatClient>,
    system_prompt: Arc<str>,
}

impl ChatAgent {
    pub fn new(chat_client: Arc<dyn ChatClient>, system_prompt: Arc<str>) -> Self {
        Self { chat_client, system_prompt }
    }

    pub fn from_args(args: &ServeArgs) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_config = LlmConfig {
            api_key: Some(args.chat_api_key.clone()).filter(|k| !k.trim().is_empty()),
            completion_model: args.chat_model.clone(),
            base_url: args.chat_base_url.clone(),
            max_tokens: Some(args.max_tokens),
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Model={}, BaseURL={}",
            chat_client.get_model(),
            chat_client.get_base_url().as_deref().unwrap_or("adapter default")
        );

        let system_prompt = resolve_system_prompt(args.system_prompt_path.as_deref())?;
        Ok(Self::new(chat_client, system_prompt))
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Shapes one submission and makes exactly one completion call.
    pub async fn process_message(
        &self,
        conversation: Conversation,
        files: Vec<AttachedFile>
    ) -> Result<String, AgentError> {
        let conversation = if files.is_empty() {
            conversation
        } else {
            let file_blocks = encode_attachments(files).await?;
            fold_attachments(conversation, file_blocks)
        };

        let messages = retain_valid(conversation);
        if messages.is_empty() {
            return Err(AgentError::EmptyConversation);
        }
        debug!("Forwarding {} valid message(s)", messages.len());

        let request = CompletionRequest {
            system: Some(self.system_prompt.to_string()),
            messages,
        };
        let reply = self.chat_client.complete(&request).await?;
        Ok(reply.response)
    }
}

/// Base64-encodes every non-empty file off the async workers. The result
/// keeps upload order; zero-byte files produce no block.
pub async fn encode_attachments(files: Vec<AttachedFile>) -> Result<Vec<ContentBlock>, AgentError> {
    let tasks = files
        .into_iter()
        .filter(|file| {
            if file.data.is_empty() {
                warn!("Skipping empty attachment '{}'", file.name);
                return false;
            }
            true
        })
        .map(|file| tokio::task::spawn_blocking(move || file.to_content_block()));
    try_join_all(tasks).await.map_err(|e| AgentError::Encoding(e.to_string()))
}

/// Replaces the last message with a single user message carrying the file
/// blocks, led by whatever the user already wrote in that message.
pub fn fold_attachments(mut conversation: Conversation, file_blocks: Vec<ContentBlock>) -> Conversation {
    if file_blocks.is_empty() {
        return conversation;
    }

    let leading: Vec<ContentBlock> = match conversation.pop() {
        Some(ChatMessage { role: Role::User, content: MessageContent::Text(text) }) => {
            if text.trim().is_empty() { Vec::new() } else { vec![ContentBlock::Text { text }] }
        }
        Some(ChatMessage { role: Role::User, content: MessageContent::Blocks(blocks) }) => {
            blocks.into_iter().filter(ContentBlock::has_payload).collect()
        }
        Some(_) | None => Vec::new(),
    };

    let mut content = leading;
    content.extend(file_blocks);
    conversation.push(ChatMessage {
        role: Role::User,
        content: MessageContent::Blocks(content),
    });
    conversation
}

pub fn retain_valid(conversation: Conversation) -> Conversation {
    conversation.into_iter().filter(ChatMessage::is_valid).collect()
}
