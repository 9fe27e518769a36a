use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} endpoint not configured")]
    Unavailable(&'static str),

    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    #[error("{service} returned HTTP {status}: {body}")]
    UpstreamStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} returned an unusable response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audio encoding error: {0}")]
    AudioEncoding(#[from] hound::Error),
}

impl InferenceError {
    /// Maps a transport error, separating timeouts from other failures.
    pub fn transport(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { service }
        } else {
            Self::Network(err)
        }
    }

    pub fn invalid(service: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }
}

pub type InferenceResult<T> = Result<T, InferenceError>;
