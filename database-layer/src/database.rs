use std::sync::Arc;

use tracing::info;

use crate::backend::DocumentBackend;
use crate::collection::Collection;
use crate::error::DatabaseResult;
use crate::memory::InMemoryBackend;
use crate::models::{ClinicalNote, Patient, Transcript, User};
use crate::postgres::{PoolConfig, PostgresBackend};

/// The application's collections over one shared backend.
#[derive(Clone)]
pub struct DocumentDatabase {
    backend: Arc<dyn DocumentBackend>,
    pub users: Collection<User>,
    pub patients: Collection<Patient>,
    pub transcripts: Collection<Transcript>,
    pub notes: Collection<ClinicalNote>,
}

impl DocumentDatabase {
    /// Wraps a backend and bootstraps every collection and declared index.
    pub async fn open(backend: Arc<dyn DocumentBackend>) -> DatabaseResult<Self> {
        let db = Self {
            users: Collection::new(Arc::clone(&backend)),
            patients: Collection::new(Arc::clone(&backend)),
            transcripts: Collection::new(Arc::clone(&backend)),
            notes: Collection::new(Arc::clone(&backend)),
            backend,
        };
        db.ensure_schema().await?;
        Ok(db)
    }

    pub async fn in_memory() -> DatabaseResult<Self> {
        Self::open(Arc::new(InMemoryBackend::new())).await
    }

    pub async fn postgres(url: &str, config: &PoolConfig) -> DatabaseResult<Self> {
        let backend = PostgresBackend::connect(url, config).await?;
        Self::open(Arc::new(backend)).await
    }

    pub async fn ensure_schema(&self) -> DatabaseResult<()> {
        self.users.ensure().await?;
        self.patients.ensure().await?;
        self.transcripts.ensure().await?;
        self.notes.ensure().await?;
        info!(backend = self.backend.name(), "Document collections ready");
        Ok(())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn ping(&self) -> DatabaseResult<()> {
        self.backend.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseError;
    use crate::models::{AudioReference, Transcript, TranscriptStatus, User, UserRole};
    use crate::query::{Filter, Query};
    use uuid::Uuid;

    fn transcript(doctor_id: Uuid, name: &str) -> Transcript {
        Transcript::processing(
            doctor_id,
            None,
            name,
            "en",
            AudioReference {
                file_name: "a.wav".into(),
                mime_type: "audio/wav".into(),
                size_bytes: 10,
                sha256: "ab".into(),
                storage_path: "/tmp/a.wav".into(),
            },
        )
    }

    #[tokio::test]
    async fn schema_violation_writes_nothing() {
        let db = DocumentDatabase::in_memory().await.unwrap();
        let bad = transcript(Uuid::new_v4(), " ");
        let err = db.transcripts.insert(&bad).await.unwrap_err();
        assert!(matches!(err, DatabaseError::SchemaViolation { .. }));
        assert_eq!(db.transcripts.count(&Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = DocumentDatabase::in_memory().await.unwrap();
        let a = User::new("doc@clinic.io", "A", UserRole::Doctor, "h".into());
        let b = User::new("DOC@clinic.io", "B", UserRole::Doctor, "h".into());
        db.users.insert(&a).await.unwrap();
        let err = db.users.insert(&b).await.unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn typed_find_filters_by_owner_and_status() {
        let db = DocumentDatabase::in_memory().await.unwrap();
        let doctor = Uuid::new_v4();
        let mut done = transcript(doctor, "Ann");
        done.complete("text".into(), Some(0.9), Some(3.0), vec![], "model");
        db.transcripts.insert(&done).await.unwrap();
        db.transcripts.insert(&transcript(doctor, "Ben")).await.unwrap();
        db.transcripts.insert(&transcript(Uuid::new_v4(), "Cy")).await.unwrap();

        let filter = Filter::new()
            .eq("doctor_id", doctor)
            .unwrap()
            .eq("status", TranscriptStatus::Completed)
            .unwrap();
        let found = db
            .transcripts
            .find(&Query::filter(filter).sort_desc("created_at"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, done.id);

        let mine = Filter::new().eq("doctor_id", doctor).unwrap();
        assert_eq!(db.transcripts.count(&mine).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn require_reports_missing_document() {
        let db = DocumentDatabase::in_memory().await.unwrap();
        let err = db.patients.require(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
