//! HTTP speech-to-text client (OpenAI-compatible `/v1/audio/transcriptions`).
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::providers::{HttpEndpoint, SpeechToText};
use crate::transcription::{SpeakerTurn, TranscriptionRequest, TranscriptionResult};

const SERVICE: &str = "speech-to-text";

#[derive(Debug, Deserialize)]
struct SpeechResponse {
    text: String,
    confidence: Option<f64>,
    duration: Option<f64>,
    language: Option<String>,
    #[serde(default)]
    segments: Vec<SegmentBody>,
}

#[derive(Debug, Deserialize)]
struct SegmentBody {
    speaker: Option<String>,
    start: f64,
    end: f64,
    text: String,
    avg_logprob: Option<f64>,
}

pub struct HttpSpeechToText {
    endpoint: HttpEndpoint,
}

impl HttpSpeechToText {
    pub fn new(config: EndpointConfig, timeout: Duration) -> InferenceResult<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(SERVICE, config, timeout)?,
        })
    }
}

/// Converts the wire body. Confidence falls back to the mean segment
/// probability and duration to the last segment end.
fn into_result(body: SpeechResponse, requested_language: &str) -> TranscriptionResult {
    let logprobs: Vec<f64> = body.segments.iter().filter_map(|s| s.avg_logprob).collect();
    let confidence = body.confidence.or_else(|| {
        if logprobs.is_empty() {
            None
        } else {
            let mean = logprobs.iter().map(|lp| lp.exp()).sum::<f64>() / logprobs.len() as f64;
            Some(mean)
        }
    });
    let duration = body
        .duration
        .or_else(|| body.segments.iter().map(|s| s.end).reduce(f64::max));

    let segments = body
        .segments
        .into_iter()
        .map(|s| SpeakerTurn {
            speaker: s.speaker.unwrap_or_else(|| "speaker".to_string()),
            start_secs: s.start,
            end_secs: s.end,
            text: s.text.trim().to_string(),
        })
        .collect();

    TranscriptionResult {
        text: body.text.trim().to_string(),
        confidence: confidence.map(|c| c.clamp(0.0, 1.0)),
        language: body
            .language
            .unwrap_or_else(|| requested_language.to_string()),
        duration_secs: duration,
        segments,
        provider: "model".to_string(),
    }
}

#[async_trait]
impl SpeechToText for HttpSpeechToText {
    fn is_configured(&self) -> bool {
        self.endpoint.is_configured()
    }

    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> InferenceResult<TranscriptionResult> {
        let file = Part::bytes(request.audio.clone())
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)
            .map_err(|e| InferenceError::Config(format!("invalid audio MIME type: {e}")))?;
        let form = Form::new()
            .part("file", file)
            .text("model", self.endpoint.model.clone())
            .text("language", request.language.clone())
            .text("response_format", "verbose_json");

        debug!(
            audio_bytes = request.audio.len(),
            mime_type = %request.mime_type,
            "Sending audio to speech-to-text"
        );
        let builder = self
            .endpoint
            .post("/v1/audio/transcriptions")?
            .multipart(form);
        let response = self.endpoint.send(builder).await?;
        let body: SpeechResponse = self.endpoint.json(response).await?;
        Ok(into_result(body, &request.language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_and_duration_are_derived_from_segments() {
        let body: SpeechResponse = serde_json::from_value(serde_json::json!({
            "text": " Patient reports headache. ",
            "segments": [
                {"start": 0.0, "end": 2.5, "text": "Patient reports", "avg_logprob": 0.0},
                {"speaker": "patient", "start": 2.5, "end": 4.0, "text": " headache. ", "avg_logprob": 0.0}
            ]
        }))
        .unwrap();
        let result = into_result(body, "en");
        assert_eq!(result.text, "Patient reports headache.");
        assert_eq!(result.confidence, Some(1.0));
        assert_eq!(result.duration_secs, Some(4.0));
        assert_eq!(result.segments[0].speaker, "speaker");
        assert_eq!(result.segments[1].text, "headache.");
        assert_eq!(result.language, "en");
    }

    #[test]
    fn reported_confidence_is_clamped() {
        let body: SpeechResponse =
            serde_json::from_value(serde_json::json!({"text": "ok", "confidence": 1.4, "duration": 3.0}))
                .unwrap();
        let result = into_result(body, "en");
        assert_eq!(result.confidence, Some(1.0));
        assert_eq!(result.duration_secs, Some(3.0));
    }

    #[tokio::test]
    async fn unconfigured_endpoint_is_unavailable() {
        let stt = HttpSpeechToText::new(EndpointConfig::unconfigured("whisper-1"), Duration::from_secs(1))
            .unwrap();
        assert!(!stt.is_configured());
        let request = TranscriptionRequest {
            audio: vec![1, 2, 3],
            file_name: "a.wav".into(),
            mime_type: "audio/wav".into(),
            language: "en".into(),
        };
        let err = stt.transcribe(&request).await.unwrap_err();
        assert!(matches!(err, InferenceError::Unavailable("speech-to-text")));
    }
}
