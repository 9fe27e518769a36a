use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use database_layer::{DocumentDatabase, PoolConfig};
use inference_service::InferenceService;
use secrecy::SecretString;
use tracing::info;

use crate::auth::{PasswordHasher, TokenService};
use crate::config::{NoteGenerationMode, ServerConfig};
use crate::storage::AudioStore;

/// Main ScribeCare server state
#[derive(Clone)]
pub struct ScribeServer {
    pub settings: Arc<ServerSettings>,
    pub db: DocumentDatabase,
    pub inference: Arc<InferenceService>,
    pub tokens: Arc<TokenService>,
    pub passwords: PasswordHasher,
    pub audio_store: AudioStore,
    pub started_at: Instant,
}

/// Non-secret settings handlers read per request.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub max_upload_bytes: usize,
    pub note_generation_mode: NoteGenerationMode,
    pub default_language: String,
}

impl ScribeServer {
    /// Connects the configured store (PostgreSQL, or in-memory when no URL
    /// is set) and builds the server state.
    pub async fn new(config: ServerConfig, inference: InferenceService) -> Result<Self> {
        let db = match config.database_url.as_deref() {
            Some(url) => {
                info!("Connecting to PostgreSQL document store");
                DocumentDatabase::postgres(url, &PoolConfig::default())
                    .await
                    .context("Failed to open PostgreSQL document store")?
            }
            None => {
                info!("DATABASE_URL not set, using in-memory document store");
                DocumentDatabase::in_memory()
                    .await
                    .context("Failed to open in-memory document store")?
            }
        };
        Self::with_database(config, db, inference)
    }

    /// Builds the state over an existing store. Useful for tests.
    pub fn with_database(
        config: ServerConfig,
        db: DocumentDatabase,
        inference: InferenceService,
    ) -> Result<Self> {
        let ServerConfig {
            jwt_secret,
            jwt_issuer,
            jwt_ttl_secs,
            upload_dir,
            max_upload_bytes,
            note_generation_mode,
            default_language,
            ..
        } = config;

        let tokens = TokenService::new(SecretString::new(jwt_secret), &jwt_issuer, jwt_ttl_secs)
            .context("Invalid JWT configuration")?;
        let passwords = PasswordHasher::new().context("Invalid password hashing parameters")?;

        Ok(Self {
            settings: Arc::new(ServerSettings {
                max_upload_bytes,
                note_generation_mode,
                default_language,
            }),
            db,
            inference: Arc::new(inference),
            tokens: Arc::new(tokens),
            passwords,
            audio_store: AudioStore::new(upload_dir),
            started_at: Instant::now(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
