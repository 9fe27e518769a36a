use std::sync::Arc;

use logger_redacted::PiiRedactor;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audio::silent_wav;
use crate::config::InferenceConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::medical_vocabulary::{ClinicalExtraction, MedicalVocabulary};
use crate::providers::{
    HttpSpeechSynthesizer, HttpSpeechToText, HttpTextGenerator, HttpTranslator, SpeechSynthesizer,
    SpeechToText, TextGenerator, Translator,
};
use crate::soap::{fallback_soap, parse_soap_sections, soap_prompt, SoapNote, SOAP_SYSTEM_PROMPT};
use crate::summary::{fallback_summary, summary_prompt, SUMMARY_SYSTEM_PROMPT};
use crate::transcription::{
    demo_transcript, TranscriptionOutcome, TranscriptionRequest,
};

/// The four collaborators behind an [`InferenceService`].
pub struct Providers {
    pub speech: Arc<dyn SpeechToText>,
    pub generator: Arc<dyn TextGenerator>,
    pub translator: Arc<dyn Translator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl Providers {
    /// HTTP clients for every endpoint in the configuration.
    pub fn from_config(config: InferenceConfig) -> InferenceResult<Self> {
        let timeout = config.timeout;
        Ok(Self {
            speech: Arc::new(HttpSpeechToText::new(config.speech, timeout)?),
            generator: Arc::new(HttpTextGenerator::new(config.generation, timeout)?),
            translator: Arc::new(HttpTranslator::new(config.translation, timeout)?),
            synthesizer: Arc::new(HttpSpeechSynthesizer::new(
                config.synthesis,
                &config.tts_voice,
                timeout,
            )?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationSource {
    Model,
    Template,
}

/// Everything the note-generation step produces for one transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedNote {
    pub soap: SoapNote,
    pub source: GenerationSource,
    pub extraction: ClinicalExtraction,
    pub patient_summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub text: String,
    /// The original text was returned untranslated.
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechOutcome {
    pub wav: Vec<u8>,
    /// Silence was returned instead of synthesized speech.
    pub fallback: bool,
}

/// Which collaborators are configured, for health output.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct InferenceStatus {
    pub speech_to_text: bool,
    pub text_generation: bool,
    pub translation: bool,
    pub text_to_speech: bool,
    pub template_transcripts: bool,
}

/// Front for the inference collaborators. Every call has a local fallback
/// and nothing is retried.
pub struct InferenceService {
    providers: Providers,
    template_transcripts: bool,
    redactor: PiiRedactor,
}

impl InferenceService {
    pub fn new(providers: Providers, template_transcripts: bool) -> Self {
        Self {
            providers,
            template_transcripts,
            redactor: PiiRedactor::default(),
        }
    }

    /// Create a service wired to the HTTP endpoints in `config`.
    pub fn from_config(config: InferenceConfig) -> InferenceResult<Self> {
        let template_transcripts = config.template_transcripts;
        if template_transcripts {
            warn!("Template transcripts enabled: unconfigured speech-to-text returns demo text");
        }
        let providers = Providers::from_config(config)?;
        Ok(Self::new(providers, template_transcripts))
    }

    pub fn with_redactor(mut self, redactor: PiiRedactor) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn status(&self) -> InferenceStatus {
        InferenceStatus {
            speech_to_text: self.providers.speech.is_configured(),
            text_generation: self.providers.generator.is_configured(),
            translation: self.providers.translator.is_configured(),
            text_to_speech: self.providers.synthesizer.is_configured(),
            template_transcripts: self.template_transcripts,
        }
    }

    /// Runs speech-to-text. Upstream errors and blank text become `Failure`.
    pub async fn transcribe(&self, request: &TranscriptionRequest) -> TranscriptionOutcome {
        if !self.providers.speech.is_configured() {
            if self.template_transcripts {
                info!("Speech-to-text not configured, using demo transcript");
                return TranscriptionOutcome::Success(demo_transcript(&request.language));
            }
            return TranscriptionOutcome::Failure {
                error: InferenceError::Unavailable("speech-to-text").to_string(),
            };
        }

        match self.providers.speech.transcribe(request).await {
            Ok(result) if result.text.trim().is_empty() => {
                warn!("Speech-to-text returned empty text");
                TranscriptionOutcome::Failure {
                    error: "speech-to-text returned no text".to_string(),
                }
            }
            Ok(result) => {
                debug!(
                    excerpt = %self.redactor.preview(&result.text),
                    confidence = ?result.confidence,
                    "Transcription completed"
                );
                TranscriptionOutcome::Success(result)
            }
            Err(e) => {
                warn!(error = %e, "Transcription failed");
                TranscriptionOutcome::Failure {
                    error: e.to_string(),
                }
            }
        }
    }

    /// SOAP note, extracted lists and patient summary. Never fails: model
    /// errors and unparseable output switch to the keyword templates.
    pub async fn generate_note(&self, transcript: &str, patient_name: &str) -> GeneratedNote {
        let (soap, source) = self.generate_soap(transcript, patient_name).await;
        let extraction = MedicalVocabulary::extract(transcript, &soap.assessment, &soap.plan);
        let patient_summary = self.summarize(&soap, &extraction, patient_name).await;
        GeneratedNote {
            soap,
            source,
            extraction,
            patient_summary,
        }
    }

    async fn generate_soap(&self, transcript: &str, patient_name: &str) -> (SoapNote, GenerationSource) {
        if !self.providers.generator.is_configured() {
            debug!("Text generation not configured, using SOAP template");
            return (fallback_soap(transcript), GenerationSource::Template);
        }
        let prompt = soap_prompt(transcript, patient_name);
        match self.providers.generator.complete(SOAP_SYSTEM_PROMPT, &prompt).await {
            Ok(output) => match parse_soap_sections(&output) {
                Some(soap) => (soap, GenerationSource::Model),
                None => {
                    warn!(
                        output = %self.redactor.preview(&output),
                        "Model output has no SOAP structure, using template"
                    );
                    (fallback_soap(transcript), GenerationSource::Template)
                }
            },
            Err(e) => {
                warn!(error = %e, "SOAP generation failed, using template");
                (fallback_soap(transcript), GenerationSource::Template)
            }
        }
    }

    async fn summarize(
        &self,
        soap: &SoapNote,
        extraction: &ClinicalExtraction,
        patient_name: &str,
    ) -> String {
        if self.providers.generator.is_configured() {
            let prompt = summary_prompt(soap, patient_name);
            match self
                .providers
                .generator
                .complete(SUMMARY_SYSTEM_PROMPT, &prompt)
                .await
            {
                Ok(text) if !text.trim().is_empty() => return text.trim().to_string(),
                Ok(_) => warn!("Summary generation returned empty text, using template"),
                Err(e) => warn!(error = %e, "Summary generation failed, using template"),
            }
        }
        fallback_summary(soap, extraction, patient_name)
    }

    /// Translates `text`; returns it unchanged with `fallback` set when the
    /// translation service is unavailable or fails.
    pub async fn translate(&self, text: &str, source: &str, target: &str) -> TranslationOutcome {
        if source.eq_ignore_ascii_case(target) {
            return TranslationOutcome {
                text: text.to_string(),
                fallback: false,
            };
        }
        if self.providers.translator.is_configured() {
            match self.providers.translator.translate(text, source, target).await {
                Ok(translated) => {
                    return TranslationOutcome {
                        text: translated,
                        fallback: false,
                    }
                }
                Err(e) => warn!(error = %e, target, "Translation failed, returning original text"),
            }
        }
        TranslationOutcome {
            text: text.to_string(),
            fallback: true,
        }
    }

    /// Synthesizes speech, or one second of silence when the service is
    /// unavailable or fails.
    ///
    /// # Errors
    ///
    /// Only when the silent fallback itself cannot be encoded.
    pub async fn synthesize(&self, text: &str, language: &str) -> InferenceResult<SpeechOutcome> {
        if self.providers.synthesizer.is_configured() {
            match self.providers.synthesizer.synthesize(text, language).await {
                Ok(wav) => return Ok(SpeechOutcome { wav, fallback: false }),
                Err(e) => warn!(error = %e, "Speech synthesis failed, returning silence"),
            }
        }
        Ok(SpeechOutcome {
            wav: silent_wav(1)?,
            fallback: true,
        })
    }
}
