use std::collections::HashMap;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use database_layer::{ClinicalNote, Filter, NoteStatus, Query as StoreQuery, SummaryTranslation};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{api_success, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::ScribeServer;

/// What a patient sees of an approved note. SOAP sections stay clinician-only.
#[derive(Debug, Serialize, ToSchema)]
pub struct PortalNoteView {
    pub note_id: Uuid,
    pub patient_name: String,
    pub doctor_name: Option<String>,
    pub patient_summary: String,
    pub medications: Vec<String>,
    pub recommendations: Vec<String>,
    pub translations: Vec<SummaryTranslation>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl PortalNoteView {
    fn new(note: ClinicalNote, doctor_name: Option<String>) -> Self {
        Self {
            note_id: note.id,
            patient_name: note.patient_name,
            doctor_name,
            patient_summary: note.patient_summary,
            medications: note.medications,
            recommendations: note.recommendations,
            translations: note.translations,
            created_at: note.created_at,
            approved_at: note.approved_at,
        }
    }
}

/// Approved notes for every patient record linked to the caller
#[utoipa::path(
    get,
    path = "/api/v1/portal/notes",
    responses(
        (status = 200, description = "Approved note summaries, newest first", body = Vec<PortalNoteView>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Patient role required")
    ),
    tag = "portal",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(server, auth), fields(user_id = %auth.user_id))]
pub async fn list_portal_notes(
    State(server): State<ScribeServer>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<PortalNoteView>>>> {
    auth.require_patient()?;

    let linked = server
        .db
        .patients
        .find(&StoreQuery::filter(Filter::new().eq("user_id", auth.user_id)?))
        .await?;

    let mut notes = Vec::new();
    for patient in &linked {
        let filter = Filter::new()
            .eq("patient_id", patient.id)?
            .eq("status", NoteStatus::Approved)?;
        notes.extend(server.db.notes.find(&StoreQuery::filter(filter)).await?);
    }
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut doctor_names: HashMap<Uuid, Option<String>> = HashMap::new();
    let mut views = Vec::with_capacity(notes.len());
    for note in notes {
        let name = match doctor_names.get(&note.doctor_id) {
            Some(name) => name.clone(),
            None => {
                let name = server.db.users.get(note.doctor_id).await?.map(|u| u.name);
                doctor_names.insert(note.doctor_id, name.clone());
                name
            }
        };
        views.push(PortalNoteView::new(note, name));
    }

    Ok(Json(api_success(views)))
}
