use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EndpointConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::providers::{HttpEndpoint, Translator};

const SERVICE: &str = "translation";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    model: &'a str,
    text: &'a str,
    source_language: &'a str,
    target_language: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translated_text: String,
}

/// Remote machine-translation client (`POST /v1/translate`).
pub struct HttpTranslator {
    endpoint: HttpEndpoint,
}

impl HttpTranslator {
    pub fn new(config: EndpointConfig, timeout: Duration) -> InferenceResult<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(SERVICE, config, timeout)?,
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    fn is_configured(&self) -> bool {
        self.endpoint.is_configured()
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> InferenceResult<String> {
        let body = TranslateRequest {
            model: &self.endpoint.model,
            text,
            source_language,
            target_language,
        };
        let builder = self.endpoint.post("/v1/translate")?.json(&body);
        let response = self.endpoint.send(builder).await?;
        let parsed: TranslateResponse = self.endpoint.json(response).await?;
        let translated = parsed.translated_text.trim().to_string();
        if translated.is_empty() {
            return Err(InferenceError::invalid(SERVICE, "empty translation"));
        }
        Ok(translated)
    }
}
