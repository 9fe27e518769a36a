//! Audio upload → transcript → clinical note.
//!
//! Every upload check happens before the first write. After that the
//! transcript is inserted as `processing`, updated once with the
//! transcription outcome, and a note is generated only for a `completed`
//! transcript. Nothing is retried: uploading the same audio again creates a
//! new transcript and a new note.

use std::sync::Arc;

use database_layer::{
    ClinicalNote, DatabaseError, DocumentDatabase, NoteSource, SoapSections, SpeakerSegment,
    Transcript, TranscriptStatus,
};
use inference_service::{
    GenerationSource, InferenceService, SoapNote, TranscriptionOutcome, TranscriptionRequest,
    TranscriptionResult,
};
use logger_redacted::PiiRedactor;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::NoteGenerationMode;
use crate::error::ApiError;
use crate::server::ScribeServer;
use crate::storage::{is_allowed_audio_type, AudioStore};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Audio type '{0}' is not supported")]
    UnsupportedMediaType(String),

    #[error("Audio exceeds the upload limit of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Audio file is empty")]
    EmptyAudio,

    #[error("Patient name is required")]
    MissingPatientName,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Transcript {0} is not completed")]
    TranscriptNotCompleted(Uuid),

    #[error("Transcription failed for transcript {transcript_id}: {reason}")]
    TranscriptionFailed { transcript_id: Uuid, reason: String },

    #[error("Failed to store audio: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::UnsupportedMediaType(_) => ApiError::unsupported_media_type(err.to_string()),
            PipelineError::TooLarge { .. } => ApiError::payload_too_large(err.to_string()),
            PipelineError::EmptyAudio | PipelineError::MissingPatientName => {
                ApiError::validation(err.to_string())
            }
            PipelineError::PatientNotFound => ApiError::not_found("patient"),
            PipelineError::TranscriptNotCompleted(_) => ApiError::conflict(err.to_string()),
            PipelineError::TranscriptionFailed {
                transcript_id,
                reason,
            } => ApiError::TranscriptionFailed {
                transcript_id,
                reason,
            },
            PipelineError::Storage(e) => ApiError::internal(format!("audio storage: {e}")),
            PipelineError::Database(e) => ApiError::Database(e),
        }
    }
}

/// The recording as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedAudio {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub patient_name: String,
    pub language: String,
    pub audio: UploadedAudio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoteGenerationState {
    Completed,
    /// The upload still succeeded; no note was stored.
    Failed,
    /// Running in the background; poll the transcript's note endpoint.
    Scheduled,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadOutcome {
    pub transcript_id: Uuid,
    pub session_id: Uuid,
    pub status: TranscriptStatus,
    pub raw_text: Option<String>,
    pub confidence: Option<f64>,
    pub duration_secs: Option<f64>,
    pub provider: Option<String>,
    pub note_id: Option<Uuid>,
    pub note_generation: NoteGenerationState,
}

#[derive(Clone)]
pub struct ConsultationPipeline {
    db: DocumentDatabase,
    inference: Arc<InferenceService>,
    audio_store: AudioStore,
    mode: NoteGenerationMode,
    max_upload_bytes: usize,
    redactor: PiiRedactor,
}

impl ConsultationPipeline {
    pub fn new(
        db: DocumentDatabase,
        inference: Arc<InferenceService>,
        audio_store: AudioStore,
        mode: NoteGenerationMode,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            db,
            inference,
            audio_store,
            mode,
            max_upload_bytes,
            redactor: PiiRedactor::default(),
        }
    }

    pub fn from_server(server: &ScribeServer) -> Self {
        Self::new(
            server.db.clone(),
            Arc::clone(&server.inference),
            server.audio_store.clone(),
            server.settings.note_generation_mode,
            server.settings.max_upload_bytes,
        )
    }

    /// MIME type and size checks; also applied while the multipart body is
    /// still streaming so oversized uploads stop early.
    pub fn check_audio(&self, mime_type: &str, size: usize) -> Result<(), PipelineError> {
        if !is_allowed_audio_type(mime_type) {
            return Err(PipelineError::UnsupportedMediaType(mime_type.to_string()));
        }
        if size > self.max_upload_bytes {
            return Err(PipelineError::TooLarge {
                limit: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Runs the whole upload. A transcription failure is stored on the
    /// transcript and returned as [`PipelineError::TranscriptionFailed`]; a
    /// note-generation failure is logged and reported in the outcome only.
    #[tracing::instrument(
        skip(self, request),
        fields(doctor_id = %request.doctor_id, size = request.audio.bytes.len())
    )]
    pub async fn process_upload(&self, request: UploadRequest) -> Result<UploadOutcome, PipelineError> {
        self.check_audio(&request.audio.mime_type, request.audio.bytes.len())?;
        if request.audio.bytes.is_empty() {
            return Err(PipelineError::EmptyAudio);
        }
        if request.patient_name.trim().is_empty() {
            return Err(PipelineError::MissingPatientName);
        }
        if let Some(patient_id) = request.patient_id {
            let owned = self
                .db
                .patients
                .get(patient_id)
                .await?
                .is_some_and(|p| p.doctor_id == request.doctor_id);
            if !owned {
                return Err(PipelineError::PatientNotFound);
            }
        }

        let audio_ref = self
            .audio_store
            .save(
                &request.audio.file_name,
                &request.audio.mime_type,
                &request.audio.bytes,
            )
            .await?;
        let mut transcript = Transcript::processing(
            request.doctor_id,
            request.patient_id,
            &request.patient_name,
            &request.language,
            audio_ref,
        );
        if let Err(e) = self.db.transcripts.insert(&transcript).await {
            if let Err(io) = self.audio_store.remove(&transcript.audio).await {
                warn!(path = %transcript.audio.storage_path, error = %io, "Failed to remove orphaned audio");
            }
            return Err(e.into());
        }
        info!(transcript_id = %transcript.id, "Transcript created, transcribing");

        let transcription = TranscriptionRequest {
            audio: request.audio.bytes,
            file_name: request.audio.file_name,
            mime_type: request.audio.mime_type,
            language: request.language,
        };
        match self.inference.transcribe(&transcription).await {
            TranscriptionOutcome::Success(result) => {
                self.complete_transcript(&mut transcript, result);
                if let Err(e) = self.db.transcripts.replace(&transcript).await {
                    error!(transcript_id = %transcript.id, error = %e, "Failed to store completed transcript");
                    self.mark_failed(&mut transcript, "transcript could not be saved").await;
                    return Err(e.into());
                }
            }
            TranscriptionOutcome::Failure { error } => {
                transcript.fail(error.clone());
                if let Err(e) = self.db.transcripts.replace(&transcript).await {
                    error!(transcript_id = %transcript.id, error = %e, "Failed to store transcription failure");
                    if !self.mark_failed(&mut transcript, error.clone()).await {
                        return Err(e.into());
                    }
                }
                warn!(transcript_id = %transcript.id, error = %error, "Transcription failed");
                return Err(PipelineError::TranscriptionFailed {
                    transcript_id: transcript.id,
                    reason: error,
                });
            }
        }

        let (note_id, note_generation) = match self.mode {
            NoteGenerationMode::Inline => match self.generate_note(&transcript).await {
                Ok(note) => (Some(note.id), NoteGenerationState::Completed),
                Err(e) => {
                    error!(transcript_id = %transcript.id, error = %e, "Note generation failed");
                    (None, NoteGenerationState::Failed)
                }
            },
            NoteGenerationMode::Background => {
                let pipeline = self.clone();
                let completed = transcript.clone();
                tokio::spawn(async move {
                    if let Err(e) = pipeline.generate_note(&completed).await {
                        error!(transcript_id = %completed.id, error = %e, "Background note generation failed");
                    }
                });
                (None, NoteGenerationState::Scheduled)
            }
        };

        Ok(UploadOutcome {
            transcript_id: transcript.id,
            session_id: transcript.session_id,
            status: transcript.status,
            raw_text: transcript.raw_text,
            confidence: transcript.confidence,
            duration_secs: transcript.duration_secs,
            provider: transcript.provider,
            note_id,
            note_generation,
        })
    }

    /// One attempt to move a transcript out of `processing` after its outcome
    /// could not be stored. Returns whether the `failed` status was saved.
    async fn mark_failed(&self, transcript: &mut Transcript, reason: impl Into<String>) -> bool {
        transcript.fail(reason);
        match self.db.transcripts.replace(transcript).await {
            Ok(()) => true,
            Err(e) => {
                error!(transcript_id = %transcript.id, error = %e, "Transcript left in processing");
                false
            }
        }
    }

    fn complete_transcript(&self, transcript: &mut Transcript, result: TranscriptionResult) {
        tracing::debug!(
            transcript_id = %transcript.id,
            excerpt = %self.redactor.preview(&result.text),
            "Transcription completed"
        );
        let segments = result
            .segments
            .into_iter()
            .map(|turn| SpeakerSegment {
                speaker: turn.speaker,
                start_secs: turn.start_secs,
                end_secs: turn.end_secs,
                text: turn.text,
            })
            .collect();
        transcript.complete(
            result.text,
            result.confidence,
            result.duration_secs,
            segments,
            &result.provider,
        );
    }

    /// Builds and stores a `draft` note for a `completed` transcript.
    #[tracing::instrument(skip(self, transcript), fields(transcript_id = %transcript.id))]
    pub async fn generate_note(&self, transcript: &Transcript) -> Result<ClinicalNote, PipelineError> {
        let text = match (transcript.status, transcript.raw_text.as_deref()) {
            (TranscriptStatus::Completed, Some(text)) => text,
            _ => return Err(PipelineError::TranscriptNotCompleted(transcript.id)),
        };

        let generated = self
            .inference
            .generate_note(text, &transcript.patient_name)
            .await;
        let source = match generated.source {
            GenerationSource::Model => NoteSource::Model,
            GenerationSource::Template => NoteSource::Template,
        };

        let mut note = ClinicalNote::draft(transcript, soap_sections(generated.soap), source);
        note.medications = generated.extraction.medications;
        note.diagnoses = generated.extraction.diagnoses;
        note.recommendations = generated.extraction.recommendations;
        note.patient_summary = generated.patient_summary;

        self.db.notes.insert(&note).await?;
        info!(note_id = %note.id, source = ?note.source, "Clinical note created");
        Ok(note)
    }
}

fn soap_sections(soap: SoapNote) -> SoapSections {
    SoapSections {
        subjective: soap.subjective,
        objective: soap.objective,
        assessment: soap.assessment,
        plan: soap.plan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use database_layer::{
        DatabaseResult, DocumentBackend, Filter, InMemoryBackend, IndexSpec, Patient, Query,
    };
    use inference_service::providers::{
        MockSpeechSynthesizer, MockSpeechToText, MockTextGenerator, MockTranslator,
    };
    use inference_service::{InferenceError, Providers, SpeakerTurn};
    use serde_json::Value as JsonValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory store whose `notes` inserts always fail.
    struct FailingNotes(InMemoryBackend);

    #[async_trait]
    impl DocumentBackend for FailingNotes {
        fn name(&self) -> &'static str {
            "failing-notes"
        }
        async fn ensure_collection(&self, collection: &str, indexes: &[IndexSpec]) -> DatabaseResult<()> {
            self.0.ensure_collection(collection, indexes).await
        }
        async fn insert(&self, collection: &str, id: Uuid, doc: JsonValue) -> DatabaseResult<()> {
            if collection == "notes" {
                return Err(DatabaseError::ConnectionFailed("notes unavailable".into()));
            }
            self.0.insert(collection, id, doc).await
        }
        async fn replace(&self, collection: &str, id: Uuid, doc: JsonValue) -> DatabaseResult<()> {
            self.0.replace(collection, id, doc).await
        }
        async fn get(&self, collection: &str, id: Uuid) -> DatabaseResult<Option<JsonValue>> {
            self.0.get(collection, id).await
        }
        async fn find(&self, collection: &str, query: &Query) -> DatabaseResult<Vec<JsonValue>> {
            self.0.find(collection, query).await
        }
        async fn count(&self, collection: &str, filter: &Filter) -> DatabaseResult<u64> {
            self.0.count(collection, filter).await
        }
        async fn delete(&self, collection: &str, id: Uuid) -> DatabaseResult<bool> {
            self.0.delete(collection, id).await
        }
        async fn ping(&self) -> DatabaseResult<()> {
            self.0.ping().await
        }
    }

    /// In-memory store whose `transcripts` writes fail: every insert when
    /// `fail_insert` is set, and the first `replace_failures` replaces.
    struct FailingTranscripts {
        inner: InMemoryBackend,
        fail_insert: bool,
        replace_failures: AtomicUsize,
    }

    impl FailingTranscripts {
        fn new(fail_insert: bool, replace_failures: usize) -> Self {
            Self {
                inner: InMemoryBackend::new(),
                fail_insert,
                replace_failures: AtomicUsize::new(replace_failures),
            }
        }
    }

    #[async_trait]
    impl DocumentBackend for FailingTranscripts {
        fn name(&self) -> &'static str {
            "failing-transcripts"
        }
        async fn ensure_collection(&self, collection: &str, indexes: &[IndexSpec]) -> DatabaseResult<()> {
            self.inner.ensure_collection(collection, indexes).await
        }
        async fn insert(&self, collection: &str, id: Uuid, doc: JsonValue) -> DatabaseResult<()> {
            if collection == "transcripts" && self.fail_insert {
                return Err(DatabaseError::ConnectionFailed("transcripts unavailable".into()));
            }
            self.inner.insert(collection, id, doc).await
        }
        async fn replace(&self, collection: &str, id: Uuid, doc: JsonValue) -> DatabaseResult<()> {
            if collection == "transcripts"
                && self
                    .replace_failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(DatabaseError::ConnectionFailed("transcripts unavailable".into()));
            }
            self.inner.replace(collection, id, doc).await
        }
        async fn get(&self, collection: &str, id: Uuid) -> DatabaseResult<Option<JsonValue>> {
            self.inner.get(collection, id).await
        }
        async fn find(&self, collection: &str, query: &Query) -> DatabaseResult<Vec<JsonValue>> {
            self.inner.find(collection, query).await
        }
        async fn count(&self, collection: &str, filter: &Filter) -> DatabaseResult<u64> {
            self.inner.count(collection, filter).await
        }
        async fn delete(&self, collection: &str, id: Uuid) -> DatabaseResult<bool> {
            self.inner.delete(collection, id).await
        }
        async fn ping(&self) -> DatabaseResult<()> {
            self.inner.ping().await
        }
    }

    fn speech(result: Result<&'static str, InferenceError>) -> MockSpeechToText {
        let mut speech = MockSpeechToText::new();
        speech.expect_is_configured().return_const(true);
        speech.expect_transcribe().return_once(move |req| {
            result.map(|text| TranscriptionResult {
                text: text.to_string(),
                confidence: Some(0.87),
                language: req.language.clone(),
                duration_secs: Some(42.0),
                segments: vec![SpeakerTurn {
                    speaker: "doctor".into(),
                    start_secs: 0.0,
                    end_secs: 4.0,
                    text: text.to_string(),
                }],
                provider: "model".into(),
            })
        });
        speech
    }

    fn inference(speech: MockSpeechToText) -> Arc<InferenceService> {
        let mut generator = MockTextGenerator::new();
        generator.expect_is_configured().return_const(false);
        let mut translator = MockTranslator::new();
        translator.expect_is_configured().return_const(false);
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_is_configured().return_const(false);
        Arc::new(InferenceService::new(
            Providers {
                speech: Arc::new(speech),
                generator: Arc::new(generator),
                translator: Arc::new(translator),
                synthesizer: Arc::new(synthesizer),
            },
            false,
        ))
    }

    fn temp_store() -> AudioStore {
        AudioStore::new(std::env::temp_dir().join(format!("scribe-pipeline-{}", Uuid::new_v4())))
    }

    fn pipeline(db: DocumentDatabase, speech: MockSpeechToText) -> ConsultationPipeline {
        ConsultationPipeline::new(
            db,
            inference(speech),
            temp_store(),
            NoteGenerationMode::Inline,
            1024,
        )
    }

    fn upload(doctor_id: Uuid, mime_type: &str, bytes: Vec<u8>) -> UploadRequest {
        UploadRequest {
            doctor_id,
            patient_id: None,
            patient_name: "Maria Lopez".into(),
            language: "en".into(),
            audio: UploadedAudio {
                file_name: "visit.wav".into(),
                mime_type: mime_type.into(),
                bytes,
            },
        }
    }

    async fn counts(db: &DocumentDatabase) -> (u64, u64) {
        (
            db.transcripts.count(&Filter::new()).await.unwrap(),
            db.notes.count(&Filter::new()).await.unwrap(),
        )
    }

    #[tokio::test]
    async fn test_successful_upload_creates_transcript_and_note() {
        let db = DocumentDatabase::in_memory().await.unwrap();
        let p = pipeline(db.clone(), speech(Ok("Crushing chest pain since this morning")));
        let outcome = p.process_upload(upload(Uuid::new_v4(), "audio/wav", vec![1; 64])).await.unwrap();

        assert_eq!(outcome.status, TranscriptStatus::Completed);
        assert_eq!(outcome.confidence, Some(0.87));
        assert_eq!(outcome.note_generation, NoteGenerationState::Completed);
        let note = db.notes.require(outcome.note_id.unwrap()).await.unwrap();
        assert_eq!(note.source, NoteSource::Template);
        assert_eq!(note.transcript_id, outcome.transcript_id);
        assert_eq!(note.status, database_layer::NoteStatus::Draft);
        let transcript = db.transcripts.require(outcome.transcript_id).await.unwrap();
        assert_eq!(transcript.segments.len(), 1);
        assert_eq!(p.audio_store.file_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejected_uploads_write_nothing() {
        let db = DocumentDatabase::in_memory().await.unwrap();
        let mut never_called = MockSpeechToText::new();
        never_called.expect_is_configured().return_const(true);
        never_called.expect_transcribe().never();
        let p = pipeline(db.clone(), never_called);
        let doctor = Uuid::new_v4();

        let err = p.process_upload(upload(doctor, "video/mp4", vec![1; 10])).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedMediaType(_)));

        let err = p.process_upload(upload(doctor, "audio/wav", vec![1; 2048])).await.unwrap_err();
        assert!(matches!(err, PipelineError::TooLarge { limit: 1024 }));

        let mut nameless = upload(doctor, "audio/wav", vec![1; 10]);
        nameless.patient_name = "  ".into();
        let err = p.process_upload(nameless).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingPatientName));

        let mut unknown = upload(doctor, "audio/wav", vec![1; 10]);
        unknown.patient_id = Some(Uuid::new_v4());
        let err = p.process_upload(unknown).await.unwrap_err();
        assert!(matches!(err, PipelineError::PatientNotFound));

        assert_eq!(counts(&db).await, (0, 0));
        assert_eq!(p.audio_store.file_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_other_doctors_patient_is_not_found() {
        let db = DocumentDatabase::in_memory().await.unwrap();
        let now = chrono::Utc::now();
        let patient = Patient {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            user_id: None,
            name: "Maria Lopez".into(),
            date_of_birth: None,
            gender: None,
            phone: None,
            email: None,
            medical_record_number: None,
            allergies: vec![],
            notes: None,
            created_at: now,
            updated_at: now,
        };
        db.patients.insert(&patient).await.unwrap();
        let mut never_called = MockSpeechToText::new();
        never_called.expect_is_configured().return_const(true);
        never_called.expect_transcribe().never();
        let p = pipeline(db.clone(), never_called);

        let mut request = upload(Uuid::new_v4(), "audio/wav", vec![1; 10]);
        request.patient_id = Some(patient.id);
        assert!(matches!(
            p.process_upload(request).await,
            Err(PipelineError::PatientNotFound)
        ));
    }

    #[tokio::test]
    async fn test_transcription_failure_marks_transcript_failed() {
        let db = DocumentDatabase::in_memory().await.unwrap();
        let p = pipeline(
            db.clone(),
            speech(Err(InferenceError::Timeout {
                service: "speech-to-text",
            })),
        );
        let err = p.process_upload(upload(Uuid::new_v4(), "audio/wav", vec![1; 10])).await.unwrap_err();
        let PipelineError::TranscriptionFailed { transcript_id, reason } = err else {
            panic!("expected a transcription failure");
        };
        let transcript = db.transcripts.require(transcript_id).await.unwrap();
        assert_eq!(transcript.status, TranscriptStatus::Failed);
        assert_eq!(transcript.error.as_deref(), Some(reason.as_str()));
        assert_eq!(counts(&db).await, (1, 0));
    }

    #[tokio::test]
    async fn test_blank_transcription_is_failure() {
        let db = DocumentDatabase::in_memory().await.unwrap();
        let p = pipeline(db.clone(), speech(Ok("   ")));
        let err = p.process_upload(upload(Uuid::new_v4(), "audio/wav", vec![1; 10])).await.unwrap_err();
        assert!(matches!(err, PipelineError::TranscriptionFailed { .. }));
        assert_eq!(counts(&db).await, (1, 0));
    }

    #[tokio::test]
    async fn test_note_failure_still_succeeds() {
        let db = DocumentDatabase::open(Arc::new(FailingNotes(InMemoryBackend::new())))
            .await
            .unwrap();
        let p = pipeline(db.clone(), speech(Ok("Headache for three days")));
        let outcome = p.process_upload(upload(Uuid::new_v4(), "audio/wav", vec![1; 10])).await.unwrap();
        assert_eq!(outcome.status, TranscriptStatus::Completed);
        assert_eq!(outcome.note_generation, NoteGenerationState::Failed);
        assert!(outcome.note_id.is_none());
    }

    #[tokio::test]
    async fn test_failed_transcript_insert_removes_audio() {
        let db = DocumentDatabase::open(Arc::new(FailingTranscripts::new(true, 0)))
            .await
            .unwrap();
        let mut never_called = MockSpeechToText::new();
        never_called.expect_is_configured().return_const(true);
        never_called.expect_transcribe().never();
        let p = pipeline(db.clone(), never_called);

        let err = p.process_upload(upload(Uuid::new_v4(), "audio/wav", vec![1; 10])).await.unwrap_err();
        assert!(matches!(err, PipelineError::Database(_)));
        assert_eq!(counts(&db).await, (0, 0));
        assert_eq!(p.audio_store.file_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unsaved_completion_marks_transcript_failed() {
        let db = DocumentDatabase::open(Arc::new(FailingTranscripts::new(false, 1)))
            .await
            .unwrap();
        let p = pipeline(db.clone(), speech(Ok("Back pain after lifting")));

        let err = p.process_upload(upload(Uuid::new_v4(), "audio/wav", vec![1; 10])).await.unwrap_err();
        assert!(matches!(err, PipelineError::Database(_)));
        let stored = db.transcripts.find(&Query::default()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.first().unwrap().status, TranscriptStatus::Failed);
        assert_eq!(counts(&db).await, (1, 0));
    }

    #[tokio::test]
    async fn test_unsaved_transcription_failure_is_retried_once() {
        let db = DocumentDatabase::open(Arc::new(FailingTranscripts::new(false, 1)))
            .await
            .unwrap();
        let p = pipeline(
            db.clone(),
            speech(Err(InferenceError::Timeout {
                service: "speech-to-text",
            })),
        );

        let err = p.process_upload(upload(Uuid::new_v4(), "audio/wav", vec![1; 10])).await.unwrap_err();
        let PipelineError::TranscriptionFailed { transcript_id, .. } = err else {
            panic!("expected a transcription failure");
        };
        let transcript = db.transcripts.require(transcript_id).await.unwrap();
        assert_eq!(transcript.status, TranscriptStatus::Failed);
    }

    #[tokio::test]
    async fn test_note_requires_completed_transcript() {
        let db = DocumentDatabase::in_memory().await.unwrap();
        let p = pipeline(db.clone(), MockSpeechToText::new());
        let audio = database_layer::AudioReference {
            file_name: "a.wav".into(),
            mime_type: "audio/wav".into(),
            size_bytes: 10,
            sha256: "00".into(),
            storage_path: "/tmp/a.wav".into(),
        };
        let mut transcript = Transcript::processing(Uuid::new_v4(), None, "Jo Park", "en", audio);
        assert!(matches!(
            p.generate_note(&transcript).await,
            Err(PipelineError::TranscriptNotCompleted(_))
        ));
        transcript.fail("timeout");
        assert!(p.generate_note(&transcript).await.is_err());
        assert_eq!(counts(&db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_background_mode_schedules_note() {
        let db = DocumentDatabase::in_memory().await.unwrap();
        let mut p = pipeline(db.clone(), speech(Ok("Fever and cough")));
        p.mode = NoteGenerationMode::Background;
        let outcome = p.process_upload(upload(Uuid::new_v4(), "audio/wav", vec![1; 10])).await.unwrap();
        assert_eq!(outcome.note_generation, NoteGenerationState::Scheduled);
        assert!(outcome.note_id.is_none());

        let filter = Filter::new().eq("transcript_id", outcome.transcript_id).unwrap();
        let mut note = None;
        for _ in 0..100 {
            note = db.notes.find_one(filter.clone()).await.unwrap();
            if note.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(note.is_some());
    }
}
