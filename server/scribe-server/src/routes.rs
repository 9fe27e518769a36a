use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    handlers::{analytics, auth, health, notes, patients, portal, transcripts},
    openapi,
    server::ScribeServer,
};

pub mod paths;

/// Create health check routes
pub fn health_routes() -> Router<ScribeServer> {
    Router::new()
        .route(paths::health::HEALTH, get(health::health_check))
        .route(paths::health::VERSION, get(health::version_info))
}

/// Create authentication routes
pub fn auth_routes() -> Router<ScribeServer> {
    Router::new()
        .route(paths::auth::REGISTER, post(auth::register))
        .route(paths::auth::LOGIN, post(auth::login))
        .route(paths::auth::ME, get(auth::me))
}

/// Create patient management routes
pub fn patient_routes() -> Router<ScribeServer> {
    Router::new()
        .route(
            paths::patients::PATIENTS,
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            paths::patients::PATIENT_BY_ID,
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route(
            paths::patients::PATIENT_TRANSCRIPTS,
            get(patients::list_patient_transcripts),
        )
}

/// Create upload and transcript routes
pub fn transcript_routes() -> Router<ScribeServer> {
    Router::new()
        .route(paths::transcripts::UPLOAD, post(transcripts::upload_transcript))
        .route(paths::transcripts::TRANSCRIPTS, get(transcripts::list_transcripts))
        .route(paths::transcripts::TRANSCRIPT_BY_ID, get(transcripts::get_transcript))
        .route(paths::transcripts::TRANSCRIPT_NOTE, get(transcripts::get_transcript_note))
}

/// Create note review, translation and speech routes
pub fn note_routes() -> Router<ScribeServer> {
    Router::new()
        .route(paths::notes::NOTES, get(notes::list_notes))
        .route(
            paths::notes::NOTE_BY_ID,
            get(notes::get_note).put(notes::update_note),
        )
        .route(paths::notes::HISTORY, get(notes::get_note_history))
        // Review workflow
        .route(paths::notes::SUBMIT, post(notes::submit_note))
        .route(paths::notes::APPROVE, post(notes::approve_note))
        .route(paths::notes::REJECT, post(notes::reject_note))
        // Summary delivery
        .route(paths::notes::TRANSLATE, post(notes::translate_note))
        .route(paths::notes::SPEECH, post(notes::note_speech))
}

pub fn portal_routes() -> Router<ScribeServer> {
    Router::new().route(paths::portal::NOTES, get(portal::list_portal_notes))
}

pub fn analytics_routes() -> Router<ScribeServer> {
    Router::new().route(paths::analytics::OVERVIEW, get(analytics::overview))
}

/// Create API v1 routes
pub fn api_v1_routes() -> Router<ScribeServer> {
    Router::new()
        .merge(auth_routes())
        .merge(patient_routes())
        .merge(transcript_routes())
        .merge(note_routes())
        .merge(portal_routes())
        .merge(analytics_routes())
}

/// Create all application routes
pub fn create_routes() -> Router<ScribeServer> {
    Router::new()
        // Health check routes (no authentication required)
        .merge(health_routes())
        // API documentation routes
        .merge(openapi::create_docs_routes())
        // API v1 routes (bearer token required except register and login)
        .nest(paths::API_V1, api_v1_routes())
}
