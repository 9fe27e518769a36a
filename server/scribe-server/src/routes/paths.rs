//! Centralized API route path constants
//!
//! utoipa `#[path(...)]` attributes need string literals, so the paths in
//! handler attributes must be kept equal to these by hand. Paths inside the
//! modules are relative to [`API_V1`].

/// API base path
pub const API_V1: &str = "/api/v1";

/// Health check endpoints (not under [`API_V1`])
pub mod health {
    pub const HEALTH: &str = "/health";
    pub const VERSION: &str = "/version";
}

/// Authentication endpoints
pub mod auth {
    pub const REGISTER: &str = "/auth/register";
    pub const LOGIN: &str = "/auth/login";
    pub const ME: &str = "/auth/me";
}

/// Patient records
pub mod patients {
    pub const PATIENTS: &str = "/patients";
    pub const PATIENT_BY_ID: &str = "/patients/:id";
    pub const PATIENT_TRANSCRIPTS: &str = "/patients/:id/transcripts";
}

/// Consultation audio and transcripts
pub mod transcripts {
    pub const UPLOAD: &str = "/transcripts/upload";
    pub const TRANSCRIPTS: &str = "/transcripts";
    pub const TRANSCRIPT_BY_ID: &str = "/transcripts/:id";
    pub const TRANSCRIPT_NOTE: &str = "/transcripts/:id/note";
}

/// Clinical note review
pub mod notes {
    pub const NOTES: &str = "/notes";
    pub const NOTE_BY_ID: &str = "/notes/:id";
    pub const HISTORY: &str = "/notes/:id/history";
    pub const SUBMIT: &str = "/notes/:id/submit";
    pub const APPROVE: &str = "/notes/:id/approve";
    pub const REJECT: &str = "/notes/:id/reject";
    pub const TRANSLATE: &str = "/notes/:id/translate";
    pub const SPEECH: &str = "/notes/:id/speech";
}

/// Patient portal
pub mod portal {
    pub const NOTES: &str = "/portal/notes";
}

pub mod analytics {
    pub const OVERVIEW: &str = "/analytics/overview";
}

/// OpenAPI documentation
pub mod docs {
    pub const SWAGGER_UI: &str = "/docs";
    pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
}
