pub mod agent;
pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod server;
pub mod widget;

use agent::ChatAgent;
use cli::{ Args, Command, ServeArgs };
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.into_command() {
        Command::Chat(widget_args) => widget::repl::run_chat(widget_args).await,
        Command::Serve(serve_args) => serve(serve_args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or(llm::DEFAULT_MODEL));
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or(llm::DEFAULT_BASE_URL));
    info!("Max Tokens: {}", args.max_tokens);
    info!("System Prompt: {}", args.system_prompt_path.as_deref().unwrap_or("(built-in)"));
    info!("Max Upload Bytes: {}", args.max_upload_bytes);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(ChatAgent::from_args(&args)?);
    info!("Starting server on: {}", args.server_addr);
    let server = Server::new(agent, args);
    server.run().await?;

    Ok(())
}
