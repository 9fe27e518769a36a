pub mod generation;
pub mod speech;
pub mod synthesis;
pub mod translation;

use std::time::Duration;

use async_trait::async_trait;
#[cfg(any(test, feature = "mocks"))]
use mockall::automock;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};

use crate::config::EndpointConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::transcription::{TranscriptionRequest, TranscriptionResult};

pub use generation::HttpTextGenerator;
pub use speech::HttpSpeechToText;
pub use synthesis::HttpSpeechSynthesizer;
pub use translation::HttpTranslator;

/// Speech-to-text collaborator
#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn transcribe(&self, request: &TranscriptionRequest)
        -> InferenceResult<TranscriptionResult>;
}

/// Chat-style text generation collaborator
#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> InferenceResult<String>;
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> InferenceResult<String>;
}

/// Text-to-speech collaborator; returns WAV bytes.
#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn synthesize(&self, text: &str, language: &str) -> InferenceResult<Vec<u8>>;
}

/// Connection details shared by the HTTP collaborators.
pub(crate) struct HttpEndpoint {
    service: &'static str,
    client: Client,
    base_url: Option<String>,
    api_key: Option<SecretString>,
    pub(crate) model: String,
}

impl HttpEndpoint {
    pub(crate) fn new(
        service: &'static str,
        config: EndpointConfig,
        timeout: Duration,
    ) -> InferenceResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            service,
            client,
            base_url: config.base_url,
            api_key: config.api_key,
            model: config.model,
        })
    }

    pub(crate) fn is_configured(&self) -> bool {
        self.base_url.is_some()
            && self
                .api_key
                .as_ref()
                .is_some_and(|k| !k.expose_secret().is_empty())
    }

    /// Authorized POST to `{base_url}{path}`, or `Unavailable` when unconfigured.
    pub(crate) fn post(&self, path: &str) -> InferenceResult<RequestBuilder> {
        let (Some(base), Some(key)) = (&self.base_url, &self.api_key) else {
            return Err(InferenceError::Unavailable(self.service));
        };
        if key.expose_secret().is_empty() {
            return Err(InferenceError::Unavailable(self.service));
        }
        Ok(self
            .client
            .post(format!("{base}{path}"))
            .bearer_auth(key.expose_secret()))
    }

    /// Sends the request and rejects non-2xx responses.
    pub(crate) async fn send(&self, request: RequestBuilder) -> InferenceResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| InferenceError::transport(self.service, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::UpstreamStatus {
                service: self.service,
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }
        Ok(response)
    }

    pub(crate) async fn json<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> InferenceResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| InferenceError::invalid(self.service, e.to_string()))
    }
}
