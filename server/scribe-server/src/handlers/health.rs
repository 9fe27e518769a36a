use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::server::ScribeServer;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// `memory` or `postgres`
    pub store_backend: String,
    pub store_reachable: bool,
    pub speech_to_text: bool,
    pub text_generation: bool,
    pub translation: bool,
    pub text_to_speech: bool,
    pub template_transcripts: bool,
}

/// Version information response
#[derive(Debug, Serialize, ToSchema)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
    pub features: Vec<String>,
}

/// Health check handler. Unconfigured inference endpoints do not make the
/// server unhealthy since every one of them has a fallback; an unreachable
/// store does.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse),
        (status = 503, description = "Document store unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(server): State<ScribeServer>) -> (StatusCode, Json<HealthResponse>) {
    let store_reachable = match server.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Document store ping failed");
            false
        }
    };
    let inference = server.inference.status();

    let (code, status) = if store_reachable {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let response = HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: server.uptime_secs(),
        checks: HealthChecks {
            store_backend: server.db.backend_name().to_string(),
            store_reachable,
            speech_to_text: inference.speech_to_text,
            text_generation: inference.text_generation,
            translation: inference.translation,
            text_to_speech: inference.text_to_speech,
            template_transcripts: inference.template_transcripts,
        },
    };

    (code, Json(response))
}

/// Version information handler
#[utoipa::path(
    get,
    path = "/version",
    responses((status = 200, description = "Version information", body = VersionResponse)),
    tag = "health"
)]
pub async fn version_info() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: "ScribeCare".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        features: vec![
            "audio-transcription".to_string(),
            "soap-notes".to_string(),
            "note-review".to_string(),
            "summary-translation".to_string(),
            "summary-speech".to_string(),
            "patient-portal".to_string(),
        ],
    })
}
