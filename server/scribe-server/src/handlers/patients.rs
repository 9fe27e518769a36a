use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use database_layer::{Filter, Patient, Query as StoreQuery, Transcript, UserRole};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiErrorResponse, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::ScribeServer;
use crate::types::PaginationParams;
use crate::validation::RequestValidation;

/// Create patient request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePatientRequest {
    #[schema(example = "Maria Lopez")]
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub medical_record_number: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub notes: Option<String>,
    /// Patient portal account to link.
    pub user_id: Option<Uuid>,
}

impl RequestValidation for CreatePatientRequest {
    fn validate(&self) -> Result<(), ApiError> {
        crate::validate_required!(self.name, "Patient name is required");
        crate::validate_length!(self.name, 1, 200, "Patient name must be at most 200 characters");
        if let Some(email) = self.email.as_deref() {
            crate::validate_email!(email, "Patient email is not a valid address");
        }
        validate_birth_date(self.date_of_birth)
    }
}

/// Update patient request. Absent fields keep their value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub medical_record_number: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
}

impl RequestValidation for UpdatePatientRequest {
    fn validate(&self) -> Result<(), ApiError> {
        crate::validate_optional!(self.name, "Patient name cannot be blank");
        if let Some(email) = self.email.as_deref() {
            crate::validate_email!(email, "Patient email is not a valid address");
        }
        validate_birth_date(self.date_of_birth)
    }
}

fn validate_birth_date(date: Option<NaiveDate>) -> Result<(), ApiError> {
    match date {
        Some(dob) if dob > Utc::now().date_naive() => {
            Err(ApiError::validation("Date of birth cannot be in the future"))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PatientSearchParams {
    /// Case-insensitive substring of the patient name.
    pub search: Option<String>,
}

/// Rejects a portal link to an account that is not a patient account.
async fn check_portal_link(server: &ScribeServer, user_id: Option<Uuid>) -> ApiResult<()> {
    let Some(user_id) = user_id else {
        return Ok(());
    };
    match server.db.users.get(user_id).await? {
        Some(user) if user.role == UserRole::Patient => Ok(()),
        Some(_) => Err(ApiError::validation("Linked account must have the patient role")),
        None => Err(ApiError::not_found("user")),
    }
}

/// Loads a patient owned by the calling doctor; anything else is a 404.
pub(crate) async fn owned_patient(
    server: &ScribeServer,
    auth: &AuthContext,
    patient_id: Uuid,
) -> ApiResult<Patient> {
    auth.require_doctor()?;
    match server.db.patients.get(patient_id).await? {
        Some(patient) if patient.doctor_id == auth.user_id => Ok(patient),
        _ => Err(ApiError::not_found("patient")),
    }
}

/// Register a patient
#[utoipa::path(
    post,
    path = "/api/v1/patients",
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Invalid request", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Doctor role required")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(server, auth, request), fields(user_id = %auth.user_id))]
pub async fn create_patient(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Json(request): Json<CreatePatientRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Patient>>)> {
    auth.require_doctor()?;
    request.validate()?;
    check_portal_link(&server, request.user_id).await?;

    let now = Utc::now();
    let patient = Patient {
        id: Uuid::new_v4(),
        doctor_id: auth.user_id,
        user_id: request.user_id,
        name: request.name.trim().to_string(),
        date_of_birth: request.date_of_birth,
        gender: request.gender,
        phone: request.phone,
        email: request.email,
        medical_record_number: request.medical_record_number,
        allergies: request.allergies,
        notes: request.notes,
        created_at: now,
        updated_at: now,
    };
    server.db.patients.insert(&patient).await?;

    info!(patient_id = %patient.id, "Patient created");
    Ok((StatusCode::CREATED, Json(api_success(patient))))
}

/// List the caller's patients
#[utoipa::path(
    get,
    path = "/api/v1/patients",
    params(PatientSearchParams, PaginationParams),
    responses(
        (status = 200, description = "Patients", body = Vec<Patient>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Doctor role required")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn list_patients(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Query(search): Query<PatientSearchParams>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Patient>>>> {
    auth.require_doctor()?;

    let mut filter = Filter::new().eq("doctor_id", auth.user_id)?;
    if let Some(term) = search.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        filter = filter.contains_text("name", term);
    }
    let total = server.db.patients.count(&filter).await?;
    let query = pagination.apply(StoreQuery::filter(filter).sort_asc("name"));
    let patients = server.db.patients.find(&query).await?;

    Ok(Json(pagination.wrap_response(patients, total)))
}

/// Get a patient
#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient", body = Patient),
        (status = 404, description = "Patient not found", body = ApiErrorResponse)
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn get_patient(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Patient>>> {
    let patient = owned_patient(&server, &auth, id).await?;
    Ok(Json(api_success(patient)))
}

/// Update a patient
#[utoipa::path(
    put,
    path = "/api/v1/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient ID")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = Patient),
        (status = 400, description = "Invalid request", body = ApiErrorResponse),
        (status = 404, description = "Patient not found", body = ApiErrorResponse)
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(server, auth, request), fields(user_id = %auth.user_id))]
pub async fn update_patient(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> ApiResult<Json<ApiResponse<Patient>>> {
    request.validate()?;
    let mut patient = owned_patient(&server, &auth, id).await?;
    check_portal_link(&server, request.user_id).await?;

    if let Some(name) = request.name {
        patient.name = name.trim().to_string();
    }
    if request.date_of_birth.is_some() {
        patient.date_of_birth = request.date_of_birth;
    }
    if request.gender.is_some() {
        patient.gender = request.gender;
    }
    if request.phone.is_some() {
        patient.phone = request.phone;
    }
    if request.email.is_some() {
        patient.email = request.email;
    }
    if request.medical_record_number.is_some() {
        patient.medical_record_number = request.medical_record_number;
    }
    if let Some(allergies) = request.allergies {
        patient.allergies = allergies;
    }
    if request.notes.is_some() {
        patient.notes = request.notes;
    }
    if request.user_id.is_some() {
        patient.user_id = request.user_id;
    }
    patient.updated_at = Utc::now();
    server.db.patients.replace(&patient).await?;

    Ok(Json(api_success(patient)))
}

/// Delete a patient. Transcripts and notes keep their copy of the name.
#[utoipa::path(
    delete,
    path = "/api/v1/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 404, description = "Patient not found", body = ApiErrorResponse)
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(server, auth), fields(user_id = %auth.user_id))]
pub async fn delete_patient(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let patient = owned_patient(&server, &auth, id).await?;
    server.db.patients.delete(patient.id).await?;
    info!(patient_id = %patient.id, "Patient deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Transcripts recorded for a patient, newest first
#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}/transcripts",
    params(("id" = Uuid, Path, description = "Patient ID"), PaginationParams),
    responses(
        (status = 200, description = "Transcripts", body = Vec<Transcript>),
        (status = 404, description = "Patient not found", body = ApiErrorResponse)
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn list_patient_transcripts(
    State(server): State<ScribeServer>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Transcript>>>> {
    let patient = owned_patient(&server, &auth, id).await?;

    let filter = Filter::new()
        .eq("doctor_id", auth.user_id)?
        .eq("patient_id", patient.id)?;
    let total = server.db.transcripts.count(&filter).await?;
    let query = pagination.apply(StoreQuery::filter(filter).sort_desc("created_at"));
    let transcripts = server.db.transcripts.find(&query).await?;

    Ok(Json(pagination.wrap_response(transcripts, total)))
}
