use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::routes::paths;
use crate::server::ScribeServer;

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Main OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::handlers::health::health_check,
        crate::handlers::health::version_info,

        // Authentication endpoints
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,

        // Patients
        crate::handlers::patients::create_patient,
        crate::handlers::patients::list_patients,
        crate::handlers::patients::get_patient,
        crate::handlers::patients::update_patient,
        crate::handlers::patients::delete_patient,
        crate::handlers::patients::list_patient_transcripts,

        // Transcripts
        crate::handlers::transcripts::upload_transcript,
        crate::handlers::transcripts::list_transcripts,
        crate::handlers::transcripts::get_transcript,
        crate::handlers::transcripts::get_transcript_note,

        // Notes
        crate::handlers::notes::list_notes,
        crate::handlers::notes::get_note,
        crate::handlers::notes::get_note_history,
        crate::handlers::notes::update_note,
        crate::handlers::notes::submit_note,
        crate::handlers::notes::approve_note,
        crate::handlers::notes::reject_note,
        crate::handlers::notes::translate_note,
        crate::handlers::notes::note_speech,

        crate::handlers::portal::list_portal_notes,
        crate::handlers::analytics::overview,
    ),
    components(
        schemas(
            crate::error::ApiErrorResponse,
            crate::error::ResponseMetadata,
            crate::error::PaginationInfo,

            crate::handlers::health::HealthResponse,
            crate::handlers::health::HealthChecks,
            crate::handlers::health::VersionResponse,

            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::AuthResponse,
            crate::handlers::auth::UserProfile,

            crate::handlers::patients::CreatePatientRequest,
            crate::handlers::patients::UpdatePatientRequest,

            crate::handlers::transcripts::TranscriptUploadForm,
            crate::services::UploadOutcome,
            crate::services::NoteGenerationState,

            crate::services::NoteEdit,
            crate::services::TranslationView,
            crate::handlers::notes::ReviewCommentRequest,
            crate::handlers::notes::RejectNoteRequest,
            crate::handlers::notes::TranslateRequest,
            crate::handlers::notes::SpeechRequest,
            crate::handlers::notes::NoteHistoryResponse,

            crate::handlers::portal::PortalNoteView,
            crate::handlers::analytics::AnalyticsOverview,

            database_layer::UserRole,
            database_layer::Patient,
            database_layer::Transcript,
            database_layer::TranscriptStatus,
            database_layer::AudioReference,
            database_layer::SpeakerSegment,
            database_layer::ClinicalNote,
            database_layer::NoteStatus,
            database_layer::NoteSource,
            database_layer::SoapSections,
            database_layer::HistoryAction,
            database_layer::HistoryEntry,
            database_layer::SummaryTranslation,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Server health and version"),
        (name = "authentication", description = "Accounts and bearer tokens"),
        (name = "patients", description = "Doctor-owned patient records"),
        (name = "transcripts", description = "Consultation audio upload and transcripts"),
        (name = "notes", description = "SOAP note review, summary translation and speech"),
        (name = "portal", description = "Approved summaries for patients"),
        (name = "analytics", description = "Practice counts"),
    ),
    info(
        title = "ScribeCare API",
        version = "0.1.0",
        description = "Consultation audio to transcripts, SOAP notes and patient summaries.",
        license(name = "AGPL-3.0-only"),
    ),
)]
pub struct ApiDoc;

/// Create OpenAPI documentation routes
pub fn create_docs_routes() -> Router<ScribeServer> {
    Router::new().merge(
        SwaggerUi::new(paths::docs::SWAGGER_UI).url(paths::docs::OPENAPI_JSON, ApiDoc::openapi()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_upload_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/transcripts/upload"));
        assert!(doc.paths.paths.contains_key("/api/v1/notes/{id}/speech"));
        let schemes = doc.components.map(|c| c.security_schemes).unwrap_or_default();
        assert!(schemes.contains_key("bearer_auth"));
    }
}
