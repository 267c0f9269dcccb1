//! API module for EchoLine
//!
//! Catalog management endpoints plus static serving of the player site.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::EchoLineError;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::{build_router, AppState};

/// API server for catalog management and static files
#[derive(Debug)]
pub struct ApiServer {
    config: Arc<Config>,
}

impl ApiServer {
    /// Create a new API server; the site root must already exist
    pub fn new(config: Arc<Config>) -> crate::error::Result<Self> {
        let root = &config.server.root_dir;
        if !root.is_dir() {
            return Err(EchoLineError::Config(format!(
                "root directory {} does not exist",
                root.display()
            )));
        }

        Ok(Self { config })
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on port {}", self.config.server.port);
        server::start_http_server(self.config).await
    }
}
