use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{ Form, Part };
use reqwest::Client as HttpClient;
use serde::Deserialize;

use super::WidgetError;
use crate::models::attachment::AttachedFile;
use crate::models::chat::Conversation;

/// What the chat endpoint answered with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerPayload {
    Reply(String),
    Error(String),
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn submit(
        &self,
        conversation: &Conversation,
        files: &[AttachedFile]
    ) -> Result<ServerPayload, WidgetError>;
}

#[derive(Deserialize)]
struct ReplyBody {
    response: Option<String>,
    error: Option<String>,
}

impl ReplyBody {
    fn into_payload(self) -> ServerPayload {
        match (self.response, self.error) {
            (Some(text), _) => ServerPayload::Reply(text),
            (None, Some(message)) => ServerPayload::Error(message),
            (None, None) => ServerPayload::Error("empty reply".to_string()),
        }
    }
}

/// Posts the conversation as multipart form data to `{server_url}/api/chat`.
pub struct HttpTransport {
    http: HttpClient,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(server_url: &str) -> Self {
        Self {
            http: HttpClient::new(),
            endpoint: format!("{}/api/chat", server_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

pub fn build_form(conversation: &Conversation, files: &[AttachedFile]) -> Result<Form, WidgetError> {
    let mut form = Form::new().text("messages", serde_json::to_string(conversation)?);
    for file in files {
        let part = Part::bytes(file.data.clone())
            .file_name(file.name.clone())
            .mime_str(&file.media_type)?;
        form = form.part("files", part);
    }
    Ok(form)
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn submit(
        &self,
        conversation: &Conversation,
        files: &[AttachedFile]
    ) -> Result<ServerPayload, WidgetError> {
        let form = build_form(conversation, files)?;
        debug!(
            "Posting {} message(s) and {} file(s) to {}",
            conversation.len(),
            files.len(),
            self.endpoint
        );

        // Error statuses still carry a JSON body, so the status is not checked here.
        let body = self.http.post(&self.endpoint).multipart(form).send().await?.json::<ReplyBody>().await?;
        Ok(body.into_payload())
    }
}
