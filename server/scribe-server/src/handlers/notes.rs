use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use database_layer::{ClinicalNote, Filter, HistoryEntry, NoteStatus, Query as StoreQuery};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiErrorResponse, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::ScribeServer;
use crate::services::{NoteEdit, NoteReviewService, TranslationView};
use crate::types::PaginationParams;
use crate::validation::{is_language_code, RequestValidation};

/// Set on speech responses: `true` when the audio is silence because the
/// text-to-speech service was unavailable.
pub const SPEECH_FALLBACK_HEADER: &str = "x-speech-fallback";

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct NoteFilterParams {
    pub status: Option<NoteStatus>,
    pub patient_id: Option<Uuid>,
}

/// Optional comment for a status change
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewCommentRequest {
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectNoteRequest {
    #[schema(example = "Plan is missing follow-up interval")]
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TranslateRequest {
    #[schema(example = "es")]
    pub language: String,
}

impl RequestValidation for TranslateRequest {
    fn validate(&self) -> Result<(), ApiError> {
        crate::validate_field!(
            self.language,
            is_language_code(self.language.trim()),
            "language must be a language code such as 'es' or 'pt-BR'"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SpeechRequest {
    pub language: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoteHistoryResponse {
    pub note_id: Uuid,
    pub status: NoteStatus,
    pub history: Vec<HistoryEntry>,
}

/// List the caller's notes, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notes",
    params(NoteFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Notes", body = Vec<ClinicalNote>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Doctor role required")
    ),
    tag = "notes",
    security(("bearer_auth" = []))
)]
pub async fn list_notes(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Query(filters): Query<NoteFilterParams>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<ClinicalNote>>>> {
    auth.require_doctor()?;

    let mut filter = Filter::new().eq("doctor_id", auth.user_id)?;
    if let Some(status) = filters.status {
        filter = filter.eq("status", status)?;
    }
    if let Some(patient_id) = filters.patient_id {
        filter = filter.eq("patient_id", patient_id)?;
    }
    let total = server.db.notes.count(&filter).await?;
    let query = pagination.apply(StoreQuery::filter(filter).sort_desc("created_at"));
    let notes = server.db.notes.find(&query).await?;

    Ok(Json(pagination.wrap_response(notes, total)))
}

/// Get a note; records a `viewed` history entry
#[utoipa::path(
    get,
    path = "/api/v1/notes/{id}",
    params(("id" = Uuid, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Clinical note", body = ClinicalNote),
        (status = 404, description = "Note not found", body = ApiErrorResponse)
    ),
    tag = "notes",
    security(("bearer_auth" = []))
)]
pub async fn get_note(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<ClinicalNote>>> {
    auth.require_doctor()?;
    let note = NoteReviewService::from_server(&server).view(&auth, id).await?;
    Ok(Json(api_success(note)))
}

/// Audit trail of a note
#[utoipa::path(
    get,
    path = "/api/v1/notes/{id}/history",
    params(("id" = Uuid, Path, description = "Note ID")),
    responses(
        (status = 200, description = "History, oldest first", body = NoteHistoryResponse),
        (status = 404, description = "Note not found", body = ApiErrorResponse)
    ),
    tag = "notes",
    security(("bearer_auth" = []))
)]
pub async fn get_note_history(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<NoteHistoryResponse>>> {
    auth.require_doctor()?;
    let note = NoteReviewService::from_server(&server).history(&auth, id).await?;
    Ok(Json(api_success(NoteHistoryResponse {
        note_id: note.id,
        status: note.status,
        history: note.history,
    })))
}

/// Edit note content
#[utoipa::path(
    put,
    path = "/api/v1/notes/{id}",
    params(("id" = Uuid, Path, description = "Note ID")),
    request_body = NoteEdit,
    responses(
        (status = 200, description = "Note updated", body = ClinicalNote),
        (status = 400, description = "Edit changes nothing", body = ApiErrorResponse),
        (status = 404, description = "Note not found", body = ApiErrorResponse),
        (status = 409, description = "Note is approved", body = ApiErrorResponse)
    ),
    tag = "notes",
    security(("bearer_auth" = []))
)]
pub async fn update_note(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(edit): Json<NoteEdit>,
) -> ApiResult<Json<ApiResponse<ClinicalNote>>> {
    auth.require_doctor()?;
    let note = NoteReviewService::from_server(&server).edit(&auth, id, edit).await?;
    Ok(Json(api_success(note)))
}

/// Submit a draft or rejected note for approval
#[utoipa::path(
    post,
    path = "/api/v1/notes/{id}/submit",
    params(("id" = Uuid, Path, description = "Note ID")),
    request_body = ReviewCommentRequest,
    responses(
        (status = 200, description = "Note pending approval", body = ClinicalNote),
        (status = 409, description = "Invalid status transition", body = ApiErrorResponse)
    ),
    tag = "notes",
    security(("bearer_auth" = []))
)]
pub async fn submit_note(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    body: Option<Json<ReviewCommentRequest>>,
) -> ApiResult<Json<ApiResponse<ClinicalNote>>> {
    auth.require_doctor()?;
    let comment = body.and_then(|Json(b)| b.comment);
    let note = NoteReviewService::from_server(&server).submit(&auth, id, comment).await?;
    Ok(Json(api_success(note)))
}

/// Approve a pending note
#[utoipa::path(
    post,
    path = "/api/v1/notes/{id}/approve",
    params(("id" = Uuid, Path, description = "Note ID")),
    request_body = ReviewCommentRequest,
    responses(
        (status = 200, description = "Note approved", body = ClinicalNote),
        (status = 409, description = "Invalid status transition", body = ApiErrorResponse)
    ),
    tag = "notes",
    security(("bearer_auth" = []))
)]
pub async fn approve_note(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    body: Option<Json<ReviewCommentRequest>>,
) -> ApiResult<Json<ApiResponse<ClinicalNote>>> {
    auth.require_doctor()?;
    let comment = body.and_then(|Json(b)| b.comment);
    let note = NoteReviewService::from_server(&server).approve(&auth, id, comment).await?;
    Ok(Json(api_success(note)))
}

/// Reject a pending note with a reason
#[utoipa::path(
    post,
    path = "/api/v1/notes/{id}/reject",
    params(("id" = Uuid, Path, description = "Note ID")),
    request_body = RejectNoteRequest,
    responses(
        (status = 200, description = "Note rejected", body = ClinicalNote),
        (status = 400, description = "Reason missing", body = ApiErrorResponse),
        (status = 409, description = "Invalid status transition", body = ApiErrorResponse)
    ),
    tag = "notes",
    security(("bearer_auth" = []))
)]
pub async fn reject_note(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<RejectNoteRequest>,
) -> ApiResult<Json<ApiResponse<ClinicalNote>>> {
    auth.require_doctor()?;
    let note = NoteReviewService::from_server(&server)
        .reject(&auth, id, &request.reason)
        .await?;
    Ok(Json(api_success(note)))
}

/// Translate the patient summary
#[utoipa::path(
    post,
    path = "/api/v1/notes/{id}/translate",
    params(("id" = Uuid, Path, description = "Note ID")),
    request_body = TranslateRequest,
    responses(
        (status = 200, description = "Translated summary, or the original with fallback=true", body = TranslationView),
        (status = 400, description = "Invalid language code", body = ApiErrorResponse),
        (status = 404, description = "Note not found", body = ApiErrorResponse)
    ),
    tag = "notes",
    security(("bearer_auth" = []))
)]
pub async fn translate_note(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<TranslateRequest>,
) -> ApiResult<Json<ApiResponse<TranslationView>>> {
    request.validate()?;
    let view = NoteReviewService::from_server(&server)
        .translate(&auth, id, request.language.trim())
        .await?;
    Ok(Json(api_success(view)))
}

/// Speak the patient summary as WAV audio
#[utoipa::path(
    post,
    path = "/api/v1/notes/{id}/speech",
    params(("id" = Uuid, Path, description = "Note ID")),
    request_body = SpeechRequest,
    responses(
        (status = 200, description = "WAV audio; see the x-speech-fallback header", content_type = "audio/wav"),
        (status = 404, description = "Note not found", body = ApiErrorResponse)
    ),
    tag = "notes",
    security(("bearer_auth" = []))
)]
pub async fn note_speech(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    body: Option<Json<SpeechRequest>>,
) -> ApiResult<Response> {
    let language = body
        .and_then(|Json(b)| b.language)
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    if let Some(code) = language.as_deref() {
        if !is_language_code(code) {
            return Err(ApiError::validation(format!("'{code}' is not a language code")));
        }
    }

    let audio = NoteReviewService::from_server(&server)
        .speech(&auth, id, language.as_deref())
        .await?;
    let fallback = if audio.fallback { "true" } else { "false" };
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("audio/wav")),
            (
                header::HeaderName::from_static(SPEECH_FALLBACK_HEADER),
                HeaderValue::from_static(fallback),
            ),
        ],
        audio.wav,
    )
        .into_response())
}
