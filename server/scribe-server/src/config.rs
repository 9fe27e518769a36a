//! Server configuration from command-line flags with environment fallbacks.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Default upload cap: 50 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Whether the upload request waits for note generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NoteGenerationMode {
    /// The upload awaits the note and returns its id.
    Inline,
    /// The note is generated on a spawned task; callers poll.
    Background,
}

/// ScribeCare HTTP server
#[derive(Parser, Debug)]
#[command(name = "scribe-server")]
#[command(about = "Consultation transcription and clinical note API server")]
pub struct ServerConfig {
    /// Server bind address
    #[arg(long, env = "SCRIBE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SCRIBE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// PostgreSQL URL; the in-memory store is used when absent
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// HS256 signing secret for access tokens. Moved into a `SecretString`
    /// when the token service is built.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "JWT_ISSUER", default_value = "scribecare")]
    pub jwt_issuer: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "JWT_TTL_SECS", default_value_t = 3600)]
    pub jwt_ttl_secs: i64,

    /// Directory uploaded recordings are written to
    #[arg(long, env = "UPLOAD_DIR", default_value = "./uploads")]
    pub upload_dir: PathBuf,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    #[arg(long, env = "NOTE_GENERATION_MODE", value_enum, default_value_t = NoteGenerationMode::Inline)]
    pub note_generation_mode: NoteGenerationMode,

    /// Language code used when an upload does not name one
    #[arg(long, env = "DEFAULT_LANGUAGE", default_value = "en")]
    pub default_language: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerConfig {
    /// Configuration for tests and embedding: in-memory store, inline notes.
    pub fn for_tests(jwt_secret: &str, upload_dir: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_issuer: "scribecare".to_string(),
            jwt_ttl_secs: 3600,
            upload_dir,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            note_generation_mode: NoteGenerationMode::Inline,
            default_language: "en".to_string(),
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_with_defaults() {
        let config = ServerConfig::try_parse_from([
            "scribe-server",
            "--jwt-secret",
            "s3cret",
            "--note-generation-mode",
            "background",
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.note_generation_mode, NoteGenerationMode::Background);
        assert_eq!(config.default_language, "en");
    }
}
