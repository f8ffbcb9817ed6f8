use anyhow::Result;
use std::sync::Arc;

mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;
pub mod clients;

use clients::{HttpPostsApi, PostsApi};
use services::batch_importer::ImportOptions;
use services::session_store::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;
    let addr = config.bind_addr;

    let posts_api = Arc::new(HttpPostsApi::new(
        &config.posts_api_url,
        config.posts_api_key.clone(),
    ));

    // Build our application state
    let state = Arc::new(AppState::new(config, posts_api));
    let app = routes::app(state);

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
pub struct AppState {
    config: config::Config,
    sessions: SessionStore,
    posts_api: Arc<dyn PostsApi>,
}

impl AppState {
    fn new(config: config::Config, posts_api: Arc<dyn PostsApi>) -> Self {
        let sessions = SessionStore::new(config.session_ttl);
        Self {
            config,
            sessions,
            posts_api,
        }
    }

    fn import_options(&self) -> ImportOptions {
        ImportOptions {
            board_id: self.config.board_id.clone(),
            batch_size: self.config.batch_size,
            batch_delay: self.config.batch_delay,
        }
    }
}
