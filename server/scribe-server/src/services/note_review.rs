//! Doctor review of generated notes, plus summary translation and speech.
//!
//! Status transitions:
//!
//! ```text
//! draft ──submit──▶ pending ──approve──▶ approved
//!   ▲                  │
//!   └──edit── rejected ◀──reject──┘
//! ```
//!
//! `rejected` may also be submitted again directly. Content edits are refused
//! once a note is approved. Every action appends to the note's history; no
//! entry is ever removed. Concurrent edits are last-writer-wins.

use std::sync::Arc;

use chrono::Utc;
use database_layer::{
    ClinicalNote, DatabaseError, DocumentDatabase, HistoryAction, NoteStatus, Patient,
    SummaryTranslation,
};
use inference_service::InferenceService;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthContext;
use crate::server::ScribeServer;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Note not found")]
    NotFound,

    #[error("Not allowed to access this note")]
    Forbidden,

    #[error("Approved notes cannot be edited")]
    ApprovedImmutable,

    #[error("Cannot {action} a note in status '{}'", .from.as_str())]
    InvalidTransition { action: &'static str, from: NoteStatus },

    #[error("Edit does not change the note")]
    NoChanges,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Inference(#[from] inference_service::InferenceError),
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::NotFound => ApiError::not_found("note"),
            ReviewError::Forbidden => ApiError::authorization(err.to_string()),
            ReviewError::ApprovedImmutable | ReviewError::InvalidTransition { .. } => {
                ApiError::conflict(err.to_string())
            }
            ReviewError::NoChanges | ReviewError::Invalid(_) => ApiError::validation(err.to_string()),
            ReviewError::Database(e) => ApiError::Database(e),
            ReviewError::Inference(e) => e.into(),
        }
    }
}

/// Partial update of a note's content. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NoteEdit {
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
    pub medications: Option<Vec<String>>,
    pub diagnoses: Option<Vec<String>>,
    pub recommendations: Option<Vec<String>>,
    pub patient_summary: Option<String>,
    /// Recorded on the history entry.
    pub comment: Option<String>,
}

/// Applies `edit`, returning the names of fields whose value changed.
fn apply_edit(note: &mut ClinicalNote, edit: NoteEdit) -> Vec<String> {
    fn set<T: PartialEq>(target: &mut T, value: Option<T>, name: &str, changed: &mut Vec<String>) {
        if let Some(value) = value {
            if *target != value {
                *target = value;
                changed.push(name.to_string());
            }
        }
    }

    let mut changed = Vec::new();
    set(&mut note.soap.subjective, edit.subjective, "subjective", &mut changed);
    set(&mut note.soap.objective, edit.objective, "objective", &mut changed);
    set(&mut note.soap.assessment, edit.assessment, "assessment", &mut changed);
    set(&mut note.soap.plan, edit.plan, "plan", &mut changed);
    set(&mut note.medications, edit.medications, "medications", &mut changed);
    set(&mut note.diagnoses, edit.diagnoses, "diagnoses", &mut changed);
    set(&mut note.recommendations, edit.recommendations, "recommendations", &mut changed);
    set(&mut note.patient_summary, edit.patient_summary, "patient_summary", &mut changed);
    changed
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TranslationView {
    pub note_id: Uuid,
    #[schema(example = "es")]
    pub language: String,
    pub text: String,
    /// The original summary was returned because translation was unavailable.
    pub fallback: bool,
}

/// Synthesized summary audio.
#[derive(Debug, Clone)]
pub struct SummaryAudio {
    pub wav: Vec<u8>,
    pub fallback: bool,
}

#[derive(Clone)]
pub struct NoteReviewService {
    db: DocumentDatabase,
    inference: Arc<InferenceService>,
    default_language: String,
}

impl NoteReviewService {
    pub fn new(db: DocumentDatabase, inference: Arc<InferenceService>, default_language: &str) -> Self {
        Self {
            db,
            inference,
            default_language: default_language.to_string(),
        }
    }

    pub fn from_server(server: &ScribeServer) -> Self {
        Self::new(
            server.db.clone(),
            Arc::clone(&server.inference),
            &server.settings.default_language,
        )
    }

    /// Loads a note owned by the calling doctor.
    async fn owned(&self, auth: &AuthContext, note_id: Uuid) -> Result<ClinicalNote, ReviewError> {
        if !auth.is_doctor() {
            return Err(ReviewError::Forbidden);
        }
        match self.db.notes.get(note_id).await? {
            Some(note) if note.doctor_id == auth.user_id => Ok(note),
            _ => Err(ReviewError::NotFound),
        }
    }

    /// The owning doctor, or a patient linked to the note's patient record
    /// once the note is approved.
    async fn readable(&self, auth: &AuthContext, note_id: Uuid) -> Result<ClinicalNote, ReviewError> {
        let note = self.db.notes.get(note_id).await?.ok_or(ReviewError::NotFound)?;
        if auth.is_doctor() {
            return if note.doctor_id == auth.user_id {
                Ok(note)
            } else {
                Err(ReviewError::NotFound)
            };
        }
        if note.status != NoteStatus::Approved {
            return Err(ReviewError::NotFound);
        }
        let linked = match note.patient_id {
            Some(patient_id) => self
                .db
                .patients
                .get(patient_id)
                .await?
                .is_some_and(|p: Patient| p.user_id == Some(auth.user_id)),
            None => false,
        };
        if linked {
            Ok(note)
        } else {
            Err(ReviewError::NotFound)
        }
    }

    /// Returns the note and appends a `viewed` access entry.
    pub async fn view(&self, auth: &AuthContext, note_id: Uuid) -> Result<ClinicalNote, ReviewError> {
        let mut note = self.owned(auth, note_id).await?;
        note.record(auth.user_id, HistoryAction::Viewed, Vec::new(), None);
        self.db.notes.replace(&note).await?;
        Ok(note)
    }

    pub async fn history(&self, auth: &AuthContext, note_id: Uuid) -> Result<ClinicalNote, ReviewError> {
        self.owned(auth, note_id).await
    }

    #[tracing::instrument(skip(self, auth, edit), fields(user_id = %auth.user_id))]
    pub async fn edit(
        &self,
        auth: &AuthContext,
        note_id: Uuid,
        edit: NoteEdit,
    ) -> Result<ClinicalNote, ReviewError> {
        let mut note = self.owned(auth, note_id).await?;
        if note.status == NoteStatus::Approved {
            return Err(ReviewError::ApprovedImmutable);
        }
        let comment = edit.comment.clone();
        let changed = apply_edit(&mut note, edit);
        if changed.is_empty() {
            return Err(ReviewError::NoChanges);
        }
        if note.status == NoteStatus::Rejected {
            note.status = NoteStatus::Draft;
            note.rejection_reason = None;
        }
        note.record(auth.user_id, HistoryAction::Edited, changed, comment);
        self.db.notes.replace(&note).await?;
        info!(note_id = %note.id, "Note edited");
        Ok(note)
    }

    pub async fn submit(
        &self,
        auth: &AuthContext,
        note_id: Uuid,
        comment: Option<String>,
    ) -> Result<ClinicalNote, ReviewError> {
        let mut note = self.owned(auth, note_id).await?;
        match note.status {
            NoteStatus::Draft | NoteStatus::Rejected => {}
            from => return Err(ReviewError::InvalidTransition { action: "submit", from }),
        }
        note.status = NoteStatus::Pending;
        note.rejection_reason = None;
        note.record(auth.user_id, HistoryAction::Submitted, Vec::new(), comment);
        self.db.notes.replace(&note).await?;
        Ok(note)
    }

    #[tracing::instrument(skip(self, auth, comment), fields(user_id = %auth.user_id))]
    pub async fn approve(
        &self,
        auth: &AuthContext,
        note_id: Uuid,
        comment: Option<String>,
    ) -> Result<ClinicalNote, ReviewError> {
        let mut note = self.owned(auth, note_id).await?;
        if note.status != NoteStatus::Pending {
            return Err(ReviewError::InvalidTransition {
                action: "approve",
                from: note.status,
            });
        }
        note.status = NoteStatus::Approved;
        note.approved_by = Some(auth.user_id);
        note.approved_at = Some(Utc::now());
        note.record(auth.user_id, HistoryAction::Approved, Vec::new(), comment);
        self.db.notes.replace(&note).await?;
        info!(note_id = %note.id, "Note approved");
        Ok(note)
    }

    pub async fn reject(
        &self,
        auth: &AuthContext,
        note_id: Uuid,
        reason: &str,
    ) -> Result<ClinicalNote, ReviewError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ReviewError::Invalid("Rejection reason is required".to_string()));
        }
        let mut note = self.owned(auth, note_id).await?;
        if note.status != NoteStatus::Pending {
            return Err(ReviewError::InvalidTransition {
                action: "reject",
                from: note.status,
            });
        }
        note.status = NoteStatus::Rejected;
        note.rejection_reason = Some(reason.to_string());
        note.record(auth.user_id, HistoryAction::Rejected, Vec::new(), Some(reason.to_string()));
        self.db.notes.replace(&note).await?;
        Ok(note)
    }

    /// Translates the patient summary and stores the result on the note.
    #[tracing::instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub async fn translate(
        &self,
        auth: &AuthContext,
        note_id: Uuid,
        language: &str,
    ) -> Result<TranslationView, ReviewError> {
        let mut note = self.readable(auth, note_id).await?;
        let source_language = self
            .db
            .transcripts
            .get(note.transcript_id)
            .await?
            .map_or_else(|| self.default_language.clone(), |t| t.language);
        let outcome = self
            .inference
            .translate(&note.patient_summary, &source_language, language)
            .await;
        note.set_translation(SummaryTranslation {
            language: language.to_string(),
            text: outcome.text.clone(),
            fallback: outcome.fallback,
            created_at: Utc::now(),
        });
        note.record(
            auth.user_id,
            HistoryAction::Translated,
            vec!["translations".to_string()],
            Some(language.to_string()),
        );
        self.db.notes.replace(&note).await?;
        Ok(TranslationView {
            note_id: note.id,
            language: language.to_string(),
            text: outcome.text,
            fallback: outcome.fallback,
        })
    }

    /// Speech for the summary, using a stored translation for `language`
    /// when one exists.
    pub async fn speech(
        &self,
        auth: &AuthContext,
        note_id: Uuid,
        language: Option<&str>,
    ) -> Result<SummaryAudio, ReviewError> {
        let mut note = self.readable(auth, note_id).await?;
        let language = language.unwrap_or(&self.default_language).to_string();
        let text = note
            .translation(&language)
            .map(|t| t.text.clone())
            .unwrap_or_else(|| note.patient_summary.clone());

        let outcome = self.inference.synthesize(&text, &language).await?;
        note.record(auth.user_id, HistoryAction::SpeechGenerated, Vec::new(), Some(language));
        self.db.notes.replace(&note).await?;
        Ok(SummaryAudio {
            wav: outcome.wav,
            fallback: outcome.fallback,
        })
    }
}
