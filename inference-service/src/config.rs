use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// One downstream HTTP model service.
///
/// An endpoint without a base URL or an API key is "unavailable" and the
/// service falls back to its local substitute instead of calling it.
#[derive(Debug)]
pub struct EndpointConfig {
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub model: String,
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: &str) -> Self {
        Self {
            base_url: Some(base_url.into()),
            api_key: Some(SecretString::new(api_key.into())),
            model: model.to_string(),
        }
    }

    pub fn unconfigured(model: &str) -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: model.to_string(),
        }
    }

    /// Reads `{PREFIX}_API_URL`, `{PREFIX}_API_KEY` and `{PREFIX}_MODEL`.
    pub fn from_env(prefix: &str, default_model: &str) -> Self {
        let base_url = non_empty_var(&format!("{prefix}_API_URL"))
            .map(|url| url.trim_end_matches('/').to_string());
        let api_key = non_empty_var(&format!("{prefix}_API_KEY")).map(SecretString::new);
        let model =
            non_empty_var(&format!("{prefix}_MODEL")).unwrap_or_else(|| default_model.to_string());
        Self {
            base_url,
            api_key,
            model,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
            && self
                .api_key
                .as_ref()
                .is_some_and(|k| !k.expose_secret().is_empty())
    }
}

/// Inference configuration for all four collaborators
#[derive(Debug)]
pub struct InferenceConfig {
    pub speech: EndpointConfig,
    pub generation: EndpointConfig,
    pub translation: EndpointConfig,
    pub synthesis: EndpointConfig,
    /// Applied to every outbound request. There are no retries.
    pub timeout: Duration,
    /// Serve a canned consultation when speech-to-text is unconfigured.
    /// Development only.
    pub template_transcripts: bool,
    pub tts_voice: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            speech: EndpointConfig::unconfigured("whisper-1"),
            generation: EndpointConfig::unconfigured("gpt-4o-mini"),
            translation: EndpointConfig::unconfigured("nllb-200"),
            synthesis: EndpointConfig::unconfigured("tts-1"),
            timeout: Duration::from_secs(30),
            template_transcripts: false,
            tts_voice: "alloy".to_string(),
        }
    }
}

impl InferenceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timeout_secs = std::env::var("INFERENCE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.timeout.as_secs());

        let template_transcripts = std::env::var("SPEECH_TEMPLATE_FALLBACK")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);

        Self {
            speech: EndpointConfig::from_env("SPEECH", &defaults.speech.model),
            generation: EndpointConfig::from_env("GENERATION", &defaults.generation.model),
            translation: EndpointConfig::from_env("TRANSLATION", &defaults.translation.model),
            synthesis: EndpointConfig::from_env("TTS", &defaults.synthesis.model),
            timeout: Duration::from_secs(timeout_secs),
            template_transcripts,
            tts_voice: non_empty_var("TTS_VOICE").unwrap_or(defaults.tts_voice),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
