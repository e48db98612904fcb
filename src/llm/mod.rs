pub mod chat;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            completion_model: None,
            base_url: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM client configuration error: {0}")]
    Config(String),
    #[error("HTTP error talking to completion API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion API returned status {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("unexpected response format from completion API: {0}")]
    UnexpectedResponse(String),
}
