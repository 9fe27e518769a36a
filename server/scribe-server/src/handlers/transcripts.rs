use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use database_layer::{ClinicalNote, Filter, Query as StoreQuery, Transcript, TranscriptStatus};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiErrorResponse, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::ScribeServer;
use crate::services::{ConsultationPipeline, UploadOutcome, UploadRequest, UploadedAudio};
use crate::types::PaginationParams;
use crate::validation::is_language_code;

/// Multipart form accepted by the upload endpoint, for documentation.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct TranscriptUploadForm {
    /// The consultation recording.
    #[schema(value_type = String, format = Binary)]
    audio: Vec<u8>,
    /// Also accepted as `patientName`.
    patient_name: String,
    /// Also accepted as `patientId`.
    patient_id: Option<Uuid>,
    #[schema(example = "en")]
    language: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TranscriptFilterParams {
    pub status: Option<TranscriptStatus>,
    pub patient_id: Option<Uuid>,
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Upload exceeds the request size limit")
    } else {
        ApiError::bad_request(format!("Malformed multipart body: {}", err.body_text()))
    }
}

/// Reads the audio part chunk by chunk, failing as soon as the running size
/// passes the limit.
async fn read_audio(
    pipeline: &ConsultationPipeline,
    mut field: Field<'_>,
) -> ApiResult<UploadedAudio> {
    let file_name = field.file_name().unwrap_or("recording").to_string();
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    pipeline.check_audio(&mime_type, 0)?;

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        bytes.extend_from_slice(&chunk);
        pipeline.check_audio(&mime_type, bytes.len())?;
    }
    Ok(UploadedAudio {
        file_name,
        mime_type,
        bytes,
    })
}

async fn read_text(field: Field<'_>) -> ApiResult<String> {
    field.text().await.map_err(multipart_error)
}

/// Upload consultation audio and run transcription and note generation
#[utoipa::path(
    post,
    path = "/api/v1/transcripts/upload",
    request_body(content = TranscriptUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Transcript created", body = UploadOutcome),
        (status = 400, description = "Missing audio or patient name, or malformed patient id", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Doctor role required"),
        (status = 404, description = "Patient not found", body = ApiErrorResponse),
        (status = 413, description = "Audio too large", body = ApiErrorResponse),
        (status = 415, description = "Audio type not allowed", body = ApiErrorResponse),
        (status = 500, description = "Transcription failed; the transcript is stored as failed", body = ApiErrorResponse)
    ),
    tag = "transcripts",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(server, auth, multipart), fields(user_id = %auth.user_id))]
pub async fn upload_transcript(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<UploadOutcome>>)> {
    auth.require_doctor()?;
    let pipeline = ConsultationPipeline::from_server(&server);

    let mut audio = None;
    let mut patient_name = None;
    let mut patient_id = None;
    let mut language = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => audio = Some(read_audio(&pipeline, field).await?),
            "patient_name" | "patientName" => patient_name = Some(read_text(field).await?),
            "patient_id" | "patientId" => {
                let raw = read_text(field).await?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let id = Uuid::parse_str(raw)
                        .map_err(|_| ApiError::validation("patient_id must be a UUID"))?;
                    patient_id = Some(id);
                }
            }
            "language" => language = Some(read_text(field).await?),
            _ => {}
        }
    }

    let audio = audio.ok_or_else(|| ApiError::validation("Audio file is required (field 'audio')"))?;
    let language = match language.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) {
        Some(code) if is_language_code(&code) => code,
        Some(code) => return Err(ApiError::validation(format!("'{code}' is not a language code"))),
        None => server.settings.default_language.clone(),
    };

    let outcome = pipeline
        .process_upload(UploadRequest {
            doctor_id: auth.user_id,
            patient_id,
            patient_name: patient_name.unwrap_or_default(),
            language,
            audio,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(api_success(outcome))))
}

/// List the caller's transcripts, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transcripts",
    params(TranscriptFilterParams, PaginationParams),
    responses(
        (status = 200, description = "Transcripts", body = Vec<Transcript>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Doctor role required")
    ),
    tag = "transcripts",
    security(("bearer_auth" = []))
)]
pub async fn list_transcripts(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Query(filters): Query<TranscriptFilterParams>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Transcript>>>> {
    auth.require_doctor()?;

    let mut filter = Filter::new().eq("doctor_id", auth.user_id)?;
    if let Some(status) = filters.status {
        filter = filter.eq("status", status)?;
    }
    if let Some(patient_id) = filters.patient_id {
        filter = filter.eq("patient_id", patient_id)?;
    }
    let total = server.db.transcripts.count(&filter).await?;
    let query = pagination.apply(StoreQuery::filter(filter).sort_desc("created_at"));
    let transcripts = server.db.transcripts.find(&query).await?;

    Ok(Json(pagination.wrap_response(transcripts, total)))
}

async fn owned_transcript(server: &ScribeServer, auth: &AuthContext, id: Uuid) -> ApiResult<Transcript> {
    auth.require_doctor()?;
    match server.db.transcripts.get(id).await? {
        Some(transcript) if transcript.doctor_id == auth.user_id => Ok(transcript),
        _ => Err(ApiError::not_found("transcript")),
    }
}

/// Get a transcript
#[utoipa::path(
    get,
    path = "/api/v1/transcripts/{id}",
    params(("id" = Uuid, Path, description = "Transcript ID")),
    responses(
        (status = 200, description = "Transcript", body = Transcript),
        (status = 404, description = "Transcript not found", body = ApiErrorResponse)
    ),
    tag = "transcripts",
    security(("bearer_auth" = []))
)]
pub async fn get_transcript(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Transcript>>> {
    let transcript = owned_transcript(&server, &auth, id).await?;
    Ok(Json(api_success(transcript)))
}

/// The note generated from a transcript. 404 until generation has finished,
/// so clients poll this after a background upload.
#[utoipa::path(
    get,
    path = "/api/v1/transcripts/{id}/note",
    params(("id" = Uuid, Path, description = "Transcript ID")),
    responses(
        (status = 200, description = "Clinical note", body = ClinicalNote),
        (status = 404, description = "Transcript or note not found", body = ApiErrorResponse)
    ),
    tag = "transcripts",
    security(("bearer_auth" = []))
)]
pub async fn get_transcript_note(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<ClinicalNote>>> {
    let transcript = owned_transcript(&server, &auth, id).await?;
    let filter = Filter::new()
        .eq("transcript_id", transcript.id)?
        .eq("doctor_id", auth.user_id)?;
    let note = server
        .db
        .notes
        .find_one(filter)
        .await?
        .ok_or_else(|| ApiError::not_found("note"))?;
    Ok(Json(api_success(note)))
}
