use crate::agent::{ AgentError, ChatAgent };
use crate::cli::ServeArgs;
use crate::models::attachment::{ AttachedFile, DEFAULT_MEDIA_TYPE };
use crate::models::chat::{ ChatReply, Conversation, ErrorBody };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    body::Bytes,
    extract::{ DefaultBodyLimit, FromRequest, Multipart, Request, State },
    response::{ IntoResponse, Response },
    http::{ header::CONTENT_TYPE, StatusCode },
    Json,
};
use serde_json::{ json, Value as JsonValue };
use tower_http::cors::{ Any, CorsLayer };
use uuid::Uuid;
use log::{ debug, info, warn, error };

pub const INVALID_MESSAGES: &str = "Invalid or missing messages";
pub const NO_VALID_MESSAGES: &str = "No valid messages";
pub const FAILED_RESPONSE: &str = "Failed to get response";

#[derive(Clone)]
struct AppState {
    agent: Arc<ChatAgent>,
}

/// What one POST to the chat endpoint carried.
#[derive(Debug, Default)]
pub struct Submission {
    pub messages: Conversation,
    pub files: Vec<AttachedFile>,
}

#[derive(Debug)]
enum SubmissionError {
    MissingMessages,
    Malformed(String),
    Body {
        status: StatusCode,
        reason: String,
    },
}

impl SubmissionError {
    fn reject(self, request_id: Uuid) -> Response {
        match self {
            SubmissionError::MissingMessages => {
                warn!("[{}] Rejected chat request: messages field missing", request_id);
                error_response(StatusCode::BAD_REQUEST, INVALID_MESSAGES)
            }
            SubmissionError::Malformed(reason) => {
                warn!("[{}] Rejected chat request: {}", request_id, reason);
                error_response(StatusCode::BAD_REQUEST, INVALID_MESSAGES)
            }
            SubmissionError::Body { status, reason } => {
                warn!("[{}] Rejected chat request body ({}): {}", request_id, status, reason);
                let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "Request too large"
                } else {
                    INVALID_MESSAGES
                };
                error_response(status, message)
            }
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody { error: message.to_string() })).into_response()
}

pub fn router(agent: Arc<ChatAgent>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(AppState { agent })
}

pub async fn start_http_server(
    args: &ServeArgs,
    agent: Arc<ChatAgent>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = args.server_addr.parse::<SocketAddr>()?;
    let app = router(agent, args.max_upload_bytes);

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert), Some(key)) => (cert, key),
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("Missing TLS certificate or key path".into());
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                return Err("TLS enabled without cert/key".into());
            }
        };
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("HTTPS server listening on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e|
            format!("Failed to bind HTTP server to {}: {}", addr, e)
        )?;
        info!("HTTP server listening on: http://{}", addr);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn chat_handler(State(state): State<AppState>, request: Request) -> Response {
    let request_id = Uuid::new_v4();

    let submission = match read_submission(request, &state).await {
        Ok(submission) => submission,
        Err(e) => {
            return e.reject(request_id);
        }
    };
    info!(
        "[{}] Chat request with {} message(s) and {} file(s)",
        request_id,
        submission.messages.len(),
        submission.files.len()
    );

    match state.agent.process_message(submission.messages, submission.files).await {
        Ok(response) => {
            info!("[{}] Reply delivered ({} chars)", request_id, response.chars().count());
            (StatusCode::OK, Json(ChatReply { response })).into_response()
        }
        Err(AgentError::EmptyConversation) => {
            warn!("[{}] No valid messages left after filtering", request_id);
            error_response(StatusCode::BAD_REQUEST, NO_VALID_MESSAGES)
        }
        Err(e) => {
            error!("[{}] Chat request failed: {}", request_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, FAILED_RESPONSE)
        }
    }
}

async fn read_submission(request: Request, state: &AppState) -> Result<Submission, SubmissionError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let multipart = Multipart::from_request(request, state).await.map_err(|e|
            SubmissionError::Body { status: e.status(), reason: e.body_text() }
        )?;
        read_multipart(multipart).await
    } else {
        let body = Bytes::from_request(request, state).await.map_err(|e|
            SubmissionError::Body { status: e.status(), reason: e.body_text() }
        )?;
        parse_json_body(&body)
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<Submission, SubmissionError> {
    let mut messages: Option<String> = None;
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(SubmissionError::Body { status: e.status(), reason: e.body_text() });
            }
        };
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(str::to_owned);

        match name.as_str() {
            "messages" if messages.is_none() => {
                // A file posted under `messages` is not a serialized conversation.
                if file_name.is_some() {
                    return Err(SubmissionError::MissingMessages);
                }
                let text = field
                    .text().await
                    .map_err(|e| SubmissionError::Body { status: e.status(), reason: e.body_text() })?;
                messages = Some(text);
            }
            "files" => {
                let Some(file_name) = file_name else {
                    debug!("Skipping files part without a filename");
                    continue;
                };
                let media_type = field.content_type().unwrap_or(DEFAULT_MEDIA_TYPE).to_string();
                let data = field
                    .bytes().await
                    .map_err(|e| SubmissionError::Body { status: e.status(), reason: e.body_text() })?;
                files.push(AttachedFile::new(file_name, media_type, data.to_vec()));
            }
            _ => {}
        }
    }

    let raw = messages.ok_or(SubmissionError::MissingMessages)?;
    let messages = parse_conversation(&raw)?;
    Ok(Submission { messages, files })
}

fn parse_conversation(raw: &str) -> Result<Conversation, SubmissionError> {
    serde_json
        ::from_str::<Conversation>(raw)
        .map_err(|e| SubmissionError::Malformed(format!("invalid conversation JSON: {}", e)))
}

fn parse_json_body(body: &[u8]) -> Result<Submission, SubmissionError> {
    let mut value: JsonValue = serde_json
        ::from_slice(body)
        .map_err(|e| SubmissionError::Malformed(format!("invalid JSON body: {}", e)))?;

    let messages = match value.get_mut("messages").map(JsonValue::take) {
        Some(raw @ JsonValue::Array(_)) =>
            serde_json
                ::from_value::<Conversation>(raw)
                .map_err(|e| SubmissionError::Malformed(format!("invalid conversation: {}", e)))?,
        Some(JsonValue::String(raw)) => parse_conversation(&raw)?,
        _ => {
            return Err(SubmissionError::MissingMessages);
        }
    };

    Ok(Submission { messages, files: Vec::new() })
}
