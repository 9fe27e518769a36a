//! ScribeCare Server - consultation audio to reviewed clinical notes
//!
//! Doctors upload a recording, the server transcribes it, drafts a SOAP note
//! and a plain-language patient summary, and the doctor reviews the note
//! through draft → pending → approved. Approved summaries can be translated,
//! spoken, and read by the linked patient through the portal.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::{NoteGenerationMode, ServerConfig};
pub use error::*;
pub use server::ScribeServer;

use axum::{extract::DefaultBodyLimit, middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Room for multipart framing and the text fields around the audio part.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the main application router with all routes and middleware
pub fn create_app(server: ScribeServer) -> Router {
    let body_limit = server
        .settings
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    routes::create_routes()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer())
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
