use clap::{ Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeArgs,
}

impl Args {
    /// The command to run. Server flags given without a subcommand mean `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the chat HTTP server (the default when no subcommand is given).
    Serve(ServeArgs),
    /// Open an interactive terminal chat against a running server.
    Chat(WidgetArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    // --- Chat LLM Provider Args ---
    /// API key for the Anthropic Messages API.
    #[arg(long, env = "ANTHROPIC_API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    /// Base URL for the completion API (e.g., https://api.anthropic.com)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let the adapter handle it if None
    pub chat_base_url: Option<String>,

    /// Model name for chat completion (e.g., claude-sonnet-4-20250514)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter default if None
    pub chat_model: Option<String>,

    /// Token budget for each completion.
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "1024")]
    pub max_tokens: u32,

    /// Optional file whose contents replace the built-in system prompt.
    #[arg(long, env = "SYSTEM_PROMPT_PATH")]
    pub system_prompt_path: Option<String>,

    // --- Server Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    /// Largest accepted request body in bytes (conversation plus attachments).
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value = "20971520")]
    pub max_upload_bytes: usize,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct WidgetArgs {
    /// Base URL of a running chat-relay server.
    #[arg(long, env = "CHAT_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    pub server_url: String,

    /// Disable ANSI styling of assistant replies.
    #[arg(long, env = "NO_COLOR", default_value = "false")]
    pub no_color: bool,
}
