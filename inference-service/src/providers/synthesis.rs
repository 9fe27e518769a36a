use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::EndpointConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::providers::{HttpEndpoint, SpeechSynthesizer};

const SERVICE: &str = "text-to-speech";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    language: &'a str,
    response_format: &'static str,
}

/// Text-to-speech client (`POST /v1/audio/speech`), WAV output.
pub struct HttpSpeechSynthesizer {
    endpoint: HttpEndpoint,
    voice: String,
}

impl HttpSpeechSynthesizer {
    pub fn new(config: EndpointConfig, voice: &str, timeout: Duration) -> InferenceResult<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(SERVICE, config, timeout)?,
            voice: voice.to_string(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    fn is_configured(&self) -> bool {
        self.endpoint.is_configured()
    }

    async fn synthesize(&self, text: &str, language: &str) -> InferenceResult<Vec<u8>> {
        let body = SpeechRequest {
            model: &self.endpoint.model,
            input: text,
            voice: &self.voice,
            language,
            response_format: "wav",
        };
        let builder = self.endpoint.post("/v1/audio/speech")?.json(&body);
        let response = self.endpoint.send(builder).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| InferenceError::transport(SERVICE, e))?;
        if bytes.is_empty() {
            return Err(InferenceError::invalid(SERVICE, "empty audio body"));
        }
        Ok(bytes.to_vec())
    }
}
