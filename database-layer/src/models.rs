// Document models for the four ScribeCare collections
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};
use crate::schema::{Document, IndexSpec};

fn require(collection: &str, ok: bool, message: &str) -> DatabaseResult<()> {
    if ok {
        Ok(())
    } else {
        Err(DatabaseError::schema(collection, message))
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

// ============================================================================
// USERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Doctor,
    Patient,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Doctor => "doctor",
            UserRole::Patient => "patient",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Always stored lower-cased.
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub password_hash: String,
    pub specialization: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, name: &str, role: UserRole, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            name: name.trim().to_string(),
            role,
            password_hash,
            specialization: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id
    }

    fn indexes() -> Vec<IndexSpec> {
        vec![
            IndexSpec::unique("users_email", &["email"]),
            IndexSpec::new("users_role", &["role"]),
        ]
    }

    fn validate(&self) -> DatabaseResult<()> {
        let c = Self::COLLECTION;
        require(c, self.email.contains('@'), "email must be an address")?;
        require(c, self.email == self.email.to_lowercase(), "email must be lower-case")?;
        require(c, !is_blank(&self.name), "name is required")?;
        require(c, !self.password_hash.is_empty(), "password hash is required")
    }
}

// ============================================================================
// PATIENTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    pub id: Uuid,
    pub doctor_id: Uuid,
    /// Patient portal account linked to this record, if any.
    pub user_id: Option<Uuid>,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Patient {
    const COLLECTION: &'static str = "patients";

    fn id(&self) -> Uuid {
        self.id
    }

    fn indexes() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new("patients_doctor_id", &["doctor_id"]),
            IndexSpec::new("patients_user_id", &["user_id"]),
            IndexSpec::new("patients_created_at", &["created_at"]),
        ]
    }

    fn validate(&self) -> DatabaseResult<()> {
        let c = Self::COLLECTION;
        require(c, !is_blank(&self.name), "name is required")?;
        if let Some(dob) = self.date_of_birth {
            require(c, dob <= Utc::now().date_naive(), "date of birth is in the future")?;
        }
        Ok(())
    }
}

// ============================================================================
// TRANSCRIPTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptStatus {
    Processing,
    Completed,
    Failed,
}

impl TranscriptStatus {
    pub const ALL: [TranscriptStatus; 3] = [Self::Processing, Self::Completed, Self::Failed];

    pub fn as_str(self) -> &'static str {
        match self {
            TranscriptStatus::Processing => "processing",
            TranscriptStatus::Completed => "completed",
            TranscriptStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SpeakerSegment {
    #[schema(example = "doctor")]
    pub speaker: String,
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Where the uploaded recording lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AudioReference {
    pub file_name: String,
    #[schema(example = "audio/webm")]
    pub mime_type: String,
    pub size_bytes: u64,
    /// Hex SHA-256 of the audio bytes.
    pub sha256: String,
    pub storage_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transcript {
    pub id: Uuid,
    pub session_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub patient_name: String,
    pub audio: AudioReference,
    #[schema(example = "en")]
    pub language: String,
    pub raw_text: Option<String>,
    /// Upstream self-reported reliability, 0..=1.
    pub confidence: Option<f64>,
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub segments: Vec<SpeakerSegment>,
    /// Which engine produced the text (`model` or `template`).
    pub provider: Option<String>,
    pub status: TranscriptStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transcript {
    /// New transcript in `processing`, before the speech-to-text call.
    pub fn processing(
        doctor_id: Uuid,
        patient_id: Option<Uuid>,
        patient_name: &str,
        language: &str,
        audio: AudioReference,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            patient_name: patient_name.trim().to_string(),
            audio,
            language: language.to_string(),
            raw_text: None,
            confidence: None,
            duration_secs: None,
            segments: Vec::new(),
            provider: None,
            status: TranscriptStatus::Processing,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete(
        &mut self,
        text: String,
        confidence: Option<f64>,
        duration_secs: Option<f64>,
        segments: Vec<SpeakerSegment>,
        provider: &str,
    ) {
        self.raw_text = Some(text);
        self.confidence = confidence.map(|c| c.clamp(0.0, 1.0));
        self.duration_secs = duration_secs.map(|d| d.max(0.0));
        self.segments = segments;
        self.provider = Some(provider.to_string());
        self.status = TranscriptStatus::Completed;
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = TranscriptStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}

impl Document for Transcript {
    const COLLECTION: &'static str = "transcripts";

    fn id(&self) -> Uuid {
        self.id
    }

    fn indexes() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new("transcripts_doctor_id", &["doctor_id"]),
            IndexSpec::new("transcripts_patient_id", &["patient_id"]),
            IndexSpec::new("transcripts_status", &["status"]),
            IndexSpec::unique("transcripts_session_id", &["session_id"]),
            IndexSpec::new("transcripts_created_at", &["created_at"]),
        ]
    }

    fn validate(&self) -> DatabaseResult<()> {
        let c = Self::COLLECTION;
        require(c, !is_blank(&self.patient_name), "patient name is required")?;
        require(c, self.audio.size_bytes > 0, "audio must not be empty")?;
        require(c, !is_blank(&self.audio.mime_type), "audio MIME type is required")?;
        if let Some(confidence) = self.confidence {
            require(
                c,
                (0.0..=1.0).contains(&confidence),
                "confidence must be between 0 and 1",
            )?;
        }
        if let Some(duration) = self.duration_secs {
            require(c, duration >= 0.0, "duration must not be negative")?;
        }
        match self.status {
            TranscriptStatus::Processing => Ok(()),
            TranscriptStatus::Completed => {
                require(
                    c,
                    self.raw_text.as_deref().is_some_and(|t| !is_blank(t)),
                    "completed transcript must have text",
                )?;
                require(c, self.completed_at.is_some(), "completed transcript needs completion time")
            }
            TranscriptStatus::Failed => require(
                c,
                self.error.as_deref().is_some_and(|e| !is_blank(e)),
                "failed transcript must record its error",
            ),
        }
    }
}

// ============================================================================
// CLINICAL NOTES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl NoteStatus {
    pub const ALL: [NoteStatus; 4] = [Self::Draft, Self::Pending, Self::Approved, Self::Rejected];

    pub fn as_str(self) -> &'static str {
        match self {
            NoteStatus::Draft => "draft",
            NoteStatus::Pending => "pending",
            NoteStatus::Approved => "approved",
            NoteStatus::Rejected => "rejected",
        }
    }
}

/// How the SOAP content was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoteSource {
    Model,
    Template,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SoapSections {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Viewed,
    Edited,
    Submitted,
    Approved,
    Rejected,
    Translated,
    SpeechGenerated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub actor_id: Uuid,
    pub action: HistoryAction,
    #[serde(default)]
    pub changed_fields: Vec<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SummaryTranslation {
    #[schema(example = "es")]
    pub language: String,
    pub text: String,
    /// Original text was kept because the translation service was unavailable.
    pub fallback: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClinicalNote {
    pub id: Uuid,
    pub transcript_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub patient_name: String,
    pub soap: SoapSections,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub diagnoses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub patient_summary: String,
    pub source: NoteSource,
    pub status: NoteStatus,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub translations: Vec<SummaryTranslation>,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClinicalNote {
    /// New `draft` note for a transcript, with its `created` history entry.
    /// Extracted lists and the summary are filled in by the caller.
    pub fn draft(transcript: &Transcript, soap: SoapSections, source: NoteSource) -> Self {
        let now = Utc::now();
        let mut note = Self {
            id: Uuid::new_v4(),
            transcript_id: transcript.id,
            doctor_id: transcript.doctor_id,
            patient_id: transcript.patient_id,
            patient_name: transcript.patient_name.clone(),
            soap,
            medications: Vec::new(),
            diagnoses: Vec::new(),
            recommendations: Vec::new(),
            patient_summary: String::new(),
            source,
            status: NoteStatus::Draft,
            rejection_reason: None,
            approved_by: None,
            approved_at: None,
            translations: Vec::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        note.record(transcript.doctor_id, HistoryAction::Created, Vec::new(), None);
        note
    }

    /// Appends a history entry. Views do not bump `updated_at`.
    pub fn record(
        &mut self,
        actor_id: Uuid,
        action: HistoryAction,
        changed_fields: Vec<String>,
        comment: Option<String>,
    ) {
        let now = Utc::now();
        self.history.push(HistoryEntry {
            at: now,
            actor_id,
            action,
            changed_fields,
            comment,
        });
        if action != HistoryAction::Viewed {
            self.updated_at = now;
        }
    }

    /// Stores `translation`, replacing any earlier one for the same language.
    pub fn set_translation(&mut self, translation: SummaryTranslation) {
        self.translations
            .retain(|t| !t.language.eq_ignore_ascii_case(&translation.language));
        self.translations.push(translation);
    }

    pub fn translation(&self, language: &str) -> Option<&SummaryTranslation> {
        self.translations
            .iter()
            .rev()
            .find(|t| t.language.eq_ignore_ascii_case(language))
    }
}

impl Document for ClinicalNote {
    const COLLECTION: &'static str = "notes";

    fn id(&self) -> Uuid {
        self.id
    }

    fn indexes() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new("notes_doctor_id", &["doctor_id"]),
            IndexSpec::new("notes_transcript_id", &["transcript_id"]),
            IndexSpec::new("notes_patient_id", &["patient_id"]),
            IndexSpec::new("notes_status", &["status"]),
            IndexSpec::new("notes_created_at", &["created_at"]),
        ]
    }

    fn validate(&self) -> DatabaseResult<()> {
        let c = Self::COLLECTION;
        require(c, !is_blank(&self.patient_name), "patient name is required")?;
        require(c, !self.history.is_empty(), "history must record creation")?;
        match self.status {
            NoteStatus::Approved => require(
                c,
                self.approved_at.is_some() && self.approved_by.is_some(),
                "approved note must record approver and time",
            ),
            NoteStatus::Rejected => require(
                c,
                self.rejection_reason.as_deref().is_some_and(|r| !is_blank(r)),
                "rejected note must carry a reason",
            ),
            NoteStatus::Draft | NoteStatus::Pending => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio() -> AudioReference {
        AudioReference {
            file_name: "visit.webm".into(),
            mime_type: "audio/webm".into(),
            size_bytes: 1024,
            sha256: "00".into(),
            storage_path: "/tmp/visit.webm".into(),
        }
    }

    #[test]
    fn transcript_lifecycle_validates() {
        let mut t = Transcript::processing(Uuid::new_v4(), None, "Jo Park", "en", audio());
        assert!(t.validate().is_ok());
        t.complete("Patient has a cough".into(), Some(1.7), Some(12.0), vec![], "model");
        assert_eq!(t.confidence, Some(1.0));
        assert!(t.validate().is_ok());
    }

    #[test]
    fn translation_is_replaced_per_language() {
        let mut t = Transcript::processing(Uuid::new_v4(), None, "Jo Park", "en", audio());
        t.complete("Patient has a cough".into(), None, None, vec![], "model");
        let mut note = ClinicalNote::draft(&t, SoapSections::default(), NoteSource::Template);
        for (language, text) in [("es", "uno"), ("fr", "un"), ("ES", "dos")] {
            note.set_translation(SummaryTranslation {
                language: language.into(),
                text: text.into(),
                fallback: false,
                created_at: Utc::now(),
            });
        }
        assert_eq!(note.translations.len(), 2);
        assert_eq!(note.translation("es").map(|t| t.text.as_str()), Some("dos"));
        assert_eq!(note.translation("fr").map(|t| t.text.as_str()), Some("un"));
    }

    #[test]
    fn failed_transcript_requires_error() {
        let mut t = Transcript::processing(Uuid::new_v4(), None, "Jo Park", "en", audio());
        t.fail("");
        assert!(matches!(t.validate(), Err(DatabaseError::SchemaViolation { .. })));
        t.fail("timeout");
        assert!(t.validate().is_ok());
    }

    #[test]
    fn transcript_rejects_out_of_range_confidence() {
        let mut t = Transcript::processing(Uuid::new_v4(), None, "Jo Park", "en", audio());
        t.confidence = Some(1.5);
        assert!(t.validate().is_err());
    }

    #[test]
    fn blank_patient_name_is_rejected() {
        let t = Transcript::processing(Uuid::new_v4(), None, "   ", "en", audio());
        assert!(t.validate().is_err());
    }

    #[test]
    fn draft_note_records_creation() {
        let mut t = Transcript::processing(Uuid::new_v4(), Some(Uuid::new_v4()), "Jo Park", "en", audio());
        t.complete("Cough".into(), Some(0.9), None, vec![], "model");
        let note = ClinicalNote::draft(&t, SoapSections::default(), NoteSource::Template);
        assert_eq!(note.status, NoteStatus::Draft);
        assert_eq!(note.patient_id, t.patient_id);
        assert_eq!(note.history.len(), 1);
        assert!(note.history.iter().all(|h| h.action == HistoryAction::Created));
        assert!(note.validate().is_ok());
    }

    #[test]
    fn approved_note_requires_approver() {
        let t = Transcript::processing(Uuid::new_v4(), None, "Jo Park", "en", audio());
        let mut note = ClinicalNote::draft(&t, SoapSections::default(), NoteSource::Model);
        note.status = NoteStatus::Approved;
        assert!(note.validate().is_err());
        note.approved_by = Some(t.doctor_id);
        note.approved_at = Some(Utc::now());
        assert!(note.validate().is_ok());
    }

    #[test]
    fn user_email_is_normalised() {
        let user = User::new(" Dr.Who@Example.COM ", "Who", UserRole::Doctor, "hash".into());
        assert_eq!(user.email, "dr.who@example.com");
        assert!(user.validate().is_ok());
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(serde_json::to_value(UserRole::Doctor).unwrap(), "doctor");
        assert_eq!(
            serde_json::to_value(HistoryAction::SpeechGenerated).unwrap(),
            "speech_generated"
        );
    }

    proptest::proptest! {
        #[test]
        fn completed_transcripts_always_validate(
            confidence in proptest::option::of(-10.0f64..10.0),
            duration in proptest::option::of(-100.0f64..10_000.0),
        ) {
            let mut t = Transcript::processing(Uuid::new_v4(), None, "Jo Park", "en", audio());
            t.complete("text".into(), confidence, duration, vec![], "model");
            proptest::prop_assert!(t.confidence.map_or(true, |c| (0.0..=1.0).contains(&c)));
            proptest::prop_assert!(t.duration_secs.map_or(true, |d| d >= 0.0));
            proptest::prop_assert!(t.validate().is_ok());
        }
    }
}
