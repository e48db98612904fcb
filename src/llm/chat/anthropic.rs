use async_trait::async_trait;
use log::{ debug, error };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;

use super::{ ChatClient, CompletionRequest, CompletionResponse };
use crate::llm::{ LlmConfig, LlmError, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL };
use crate::models::chat::Conversation;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_BETA: &str = "files-api-2025-04-14";

pub struct AnthropicChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a Conversation,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<JsonValue>,
}

impl AnthropicChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        max_tokens: Option<u32>
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("Anthropic API key is required".to_string()));
        }
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(&api_key).map_err(|e|
                LlmError::Config(format!("Invalid API key format: {}", e))
            )?
        );
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION)
        );
        headers.insert(
            HeaderName::from_static("anthropic-beta"),
            HeaderValue::from_static(ANTHROPIC_BETA)
        );

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| LlmError::Config("Anthropic API key is required".to_string()))?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.max_tokens
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

/// First content element carrying a `text` string.
fn first_text(content: &[JsonValue]) -> Option<String> {
    content
        .iter()
        .find_map(|block| block.get("text").and_then(JsonValue::as_str))
        .map(str::to_owned)
}

#[async_trait]
impl ChatClient for AnthropicChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: request.system.as_deref(),
            messages: &request.messages,
        };
        debug!(
            "Sending {} message(s) to {} (model {})",
            request.messages.len(),
            self.endpoint(),
            self.model
        );

        let resp = self.http.post(self.endpoint()).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("Completion API responded with {}: {}", status, body);
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let parsed = resp.json::<MessagesResponse>().await?;
        let text = first_text(&parsed.content).ok_or_else(||
            LlmError::UnexpectedResponse("no text block in reply".to_string())
        )?;

        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
