//! Easel Storage Server
//!
//! Stores designs, serves templates and accepts asset uploads for the Easel
//! editor. Every response uses the envelope:
//!
//! ```json
//! { "success": true, "data": { ... }, "message": "Design saved" }
//! { "success": false, "error": "Design not found" }
//! ```
//!
//! Requests that touch designs or assets need `Authorization: Bearer <token>`;
//! the token is treated as the owner key.

mod error;
mod extract;
mod routes;
mod state;

use state::{AppState, ServerConfig, load_templates};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "easel_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let templates = config.templates_file.as_deref().map(load_templates).unwrap_or_default();
    let state = Arc::new(AppState::new(&config.upload_dir).with_templates(templates));

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = match tokio::net::TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Could not bind {}: {e}", config.addr);
            std::process::exit(1);
        }
    };
    info!("Easel storage server listening on {}", config.addr);
    info!("Uploads stored in {}", config.upload_dir.display());

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {e}");
    }
}
