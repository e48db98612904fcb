pub mod files;
pub mod render;
pub mod repl;
pub mod transport;

use chrono::{ DateTime, Local };
use log::{ warn, error };
use thiserror::Error;

use crate::models::attachment::AttachedFile;
use crate::models::chat::{ ChatMessage, Conversation, MessageContent, Role };
use self::transport::ServerPayload;

pub const LOADING_INDICATOR: &str = "Thinking...";
pub const FALLBACK_NOTICE: &str = "Sorry, something went wrong. Please try again or contact support.";
pub const NETWORK_NOTICE: &str = "Sorry, a network error occurred. Please try again later.";

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to serialize conversation: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unexpected reply from server: {0}")]
    UnexpectedReply(String),
    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Sending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl TranscriptEntry {
    fn now(role: Role, text: impl Into<String>) -> Self {
        Self { role, text: text.into(), timestamp: Local::now() }
    }
}

/// Snapshot handed to the transport for one send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSend {
    pub conversation: Conversation,
    pub files: Vec<AttachedFile>,
}

#[derive(Debug)]
pub enum SendOutcome {
    Reply(String),
    ErrorPayload(String),
    TransportFailure(WidgetError),
}

impl From<Result<ServerPayload, WidgetError>> for SendOutcome {
    fn from(result: Result<ServerPayload, WidgetError>) -> Self {
        match result {
            Ok(ServerPayload::Reply(text)) => SendOutcome::Reply(text),
            Ok(ServerPayload::Error(message)) => SendOutcome::ErrorPayload(message),
            Err(e) => SendOutcome::TransportFailure(e),
        }
    }
}

/// Transcript plus staged files. At most one send is in flight at a time.
#[derive(Debug)]
pub struct ChatWidget {
    transcript: Vec<TranscriptEntry>,
    input: String,
    staged: Vec<AttachedFile>,
    state: SendState,
}

impl Default for ChatWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatWidget {
    pub fn new() -> Self {
        Self {
            transcript: Vec::new(),
            input: String::new(),
            staged: Vec::new(),
            state: SendState::Idle,
        }
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn state(&self) -> SendState {
        self.state
    }

    pub fn is_sending(&self) -> bool {
        self.state == SendState::Sending
    }

    pub fn staged_files(&self) -> &[AttachedFile] {
        &self.staged
    }

    pub fn stage_file(&mut self, file: AttachedFile) {
        self.staged.push(file);
    }

    pub fn remove_file(&mut self, index: usize) -> Option<AttachedFile> {
        if index < self.staged.len() {
            Some(self.staged.remove(index))
        } else {
            None
        }
    }

    /// The transcript as the server expects it.
    pub fn conversation(&self) -> Conversation {
        self.transcript
            .iter()
            .map(|entry| ChatMessage {
                role: entry.role,
                content: MessageContent::Text(entry.text.clone()),
            })
            .collect()
    }

    /// Commits the current input as a user message and enters `Sending`.
    /// Returns `None` when there is nothing to send or a send is in flight.
    pub fn append_user_input(&mut self) -> Option<PendingSend> {
        if self.is_sending() {
            return None;
        }
        if self.input.trim().is_empty() && self.staged.is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.input);
        self.transcript.push(TranscriptEntry::now(Role::User, text));
        self.state = SendState::Sending;

        Some(PendingSend {
            conversation: self.conversation(),
            files: self.staged.clone(),
        })
    }

    /// Records the outcome of the in-flight send and returns to `Idle`.
    pub fn finish_send(&mut self, outcome: SendOutcome) -> &TranscriptEntry {
        let text = match outcome {
            SendOutcome::Reply(text) => text,
            SendOutcome::ErrorPayload(message) => {
                warn!("Server reported an error: {}", message);
                FALLBACK_NOTICE.to_string()
            }
            SendOutcome::TransportFailure(e) => {
                error!("Chat request failed: {}", e);
                NETWORK_NOTICE.to_string()
            }
        };

        self.transcript.push(TranscriptEntry::now(Role::Assistant, text));
        self.staged.clear();
        self.state = SendState::Idle;
        &self.transcript[self.transcript.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::transport::ChatTransport;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedTransport {
        result: Mutex<Option<Result<ServerPayload, WidgetError>>>,
        seen: Mutex<Vec<PendingSend>>,
    }

    impl ScriptedTransport {
        fn new(result: Result<ServerPayload, WidgetError>) -> Self {
            Self { result: Mutex::new(Some(result)), seen: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn submit(
            &self,
            conversation: &Conversation,
            files: &[AttachedFile]
        ) -> Result<ServerPayload, WidgetError> {
            self.seen.lock().unwrap().push(PendingSend {
                conversation: conversation.clone(),
                files: files.to_vec(),
            });
            self.result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(WidgetError::UnexpectedReply("called twice".into())))
        }
    }

    fn png() -> AttachedFile {
        AttachedFile::new("chart.png", "image/png", vec![1, 2, 3])
    }

    #[test]
    fn blank_input_without_files_is_ignored() {
        let mut widget = ChatWidget::new();
        widget.set_input("   ");
        assert!(widget.append_user_input().is_none());
        assert!(widget.transcript().is_empty());
        assert_eq!(widget.state(), SendState::Idle);
        assert_eq!(widget.input(), "   ");
    }

    #[test]
    fn files_alone_are_enough_to_send() {
        let mut widget = ChatWidget::new();
        widget.stage_file(png());
        let pending = widget.append_user_input().unwrap();
        assert_eq!(pending.conversation, vec![ChatMessage::user("")]);
        assert_eq!(pending.files, vec![png()]);
    }

    #[test]
    fn append_is_optimistic_and_clears_input() {
        let mut widget = ChatWidget::new();
        widget.set_input("Hello");
        let pending = widget.append_user_input().unwrap();

        assert_eq!(pending.conversation, vec![ChatMessage::user("Hello")]);
        assert_eq!(widget.transcript().len(), 1);
        assert_eq!(widget.input(), "");
        assert!(widget.is_sending());
    }

    #[test]
    fn second_trigger_while_sending_is_ignored() {
        let mut widget = ChatWidget::new();
        widget.set_input("first");
        assert!(widget.append_user_input().is_some());

        for _ in 0..5 {
            widget.set_input("again");
            assert!(widget.append_user_input().is_none());
        }
        assert_eq!(widget.transcript().len(), 1);
        assert_eq!(widget.input(), "again");
    }

    #[test]
    fn each_outcome_appends_one_assistant_entry_and_clears_files() {
        let cases =
            vec![
            (SendOutcome::Reply("Hi there".into()), "Hi there"),
            (SendOutcome::ErrorPayload("Failed to get response".into()), FALLBACK_NOTICE),
            (
                SendOutcome::TransportFailure(WidgetError::UnexpectedReply("eof".into())),
                NETWORK_NOTICE,
            )
        ];

        for (outcome, expected) in cases {
            let mut widget = ChatWidget::new();
            widget.set_input("Hello");
            widget.stage_file(png());
            widget.append_user_input().unwrap();

            let entry = widget.finish_send(outcome).clone();
            assert_eq!(entry.role, Role::Assistant);
            assert_eq!(entry.text, expected);
            assert_eq!(widget.transcript().len(), 2);
            assert!(widget.staged_files().is_empty());
            assert_eq!(widget.state(), SendState::Idle);
        }
    }

    #[test]
    fn staged_files_can_be_removed_individually() {
        let mut widget = ChatWidget::new();
        widget.stage_file(AttachedFile::new("a.txt", "text/plain", vec![]));
        widget.stage_file(AttachedFile::new("b.txt", "text/plain", vec![]));
        widget.stage_file(AttachedFile::new("c.txt", "text/plain", vec![]));

        assert_eq!(widget.remove_file(1).map(|f| f.name), Some("b.txt".to_string()));
        assert!(widget.remove_file(7).is_none());
        let names: Vec<_> = widget.staged_files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "c.txt"]);
    }

    async fn round_trip(widget: &mut ChatWidget, transport: &ScriptedTransport) -> TranscriptEntry {
        let pending = widget.append_user_input().unwrap();
        let result = transport.submit(&pending.conversation, &pending.files).await;
        widget.finish_send(SendOutcome::from(result)).clone()
    }

    #[tokio::test]
    async fn send_carries_whole_history_and_files() {
        let transport = ScriptedTransport::new(Ok(ServerPayload::Reply("first reply".into())));
        let mut widget = ChatWidget::new();
        widget.set_input("one");
        round_trip(&mut widget, &transport).await;

        let transport2 = ScriptedTransport::new(Ok(ServerPayload::Reply("second reply".into())));
        widget.set_input("two");
        widget.stage_file(png());
        let entry = round_trip(&mut widget, &transport2).await;
        assert_eq!(entry.text, "second reply");

        let seen = transport2.seen.lock().unwrap();
        assert_eq!(seen[0].conversation, vec![
            ChatMessage::user("one"),
            ChatMessage::assistant("first reply"),
            ChatMessage::user("two")
        ]);
        assert_eq!(seen[0].files, vec![png()]);
    }
}
