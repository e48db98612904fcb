pub mod api;

use crate::agent::ChatAgent;
use crate::cli::ServeArgs;
use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;

pub struct Server {
    agent: Arc<ChatAgent>,
    args: ServeArgs,
}

impl Server {
    pub fn new(agent: Arc<ChatAgent>, args: ServeArgs) -> Self {
        if args.enable_tls {
            info!("Server configured with TLS.");
        } else {
            warn!("Server configured WITHOUT TLS. Traffic to the chat endpoint is plain HTTP.");
        }
        Self { agent, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(&self.args, Arc::clone(&self.agent)).await
    }
}
