use serde::{Deserialize, Serialize};

/// Audio handed to the speech-to-text service.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub language: String,
}

/// Transcription result from speech recognition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    /// 0..=1 when the upstream reports it.
    pub confidence: Option<f64>,
    pub language: String,
    pub duration_secs: Option<f64>,
    pub segments: Vec<SpeakerTurn>,
    /// `model` for a real upstream result, `template` for the demo transcript.
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerTurn {
    pub speaker: String,
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// What the transcription step reports. It never raises: an upstream error
/// and an empty result are both a `Failure` carrying the reason.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionOutcome {
    Success(TranscriptionResult),
    Failure { error: String },
}

impl TranscriptionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptionOutcome::Success(_))
    }
}

/// Fixed consultation used when the template fallback is switched on.
pub const DEMO_TRANSCRIPT: &str = "Doctor: Good morning, what brings you in today?\n\
Patient: I've had a cough and a fever for about three days. I feel tired and my throat is sore.\n\
Doctor: Any shortness of breath or chest pain?\n\
Patient: No, just the cough. I took some acetaminophen last night.\n\
Doctor: Your temperature is 38.2 and your lungs sound clear. This looks like an upper respiratory infection.\n\
Doctor: Rest, drink plenty of fluids and continue acetaminophen as needed for fever. Follow up in one week if you are not improving.";

pub fn demo_transcript(language: &str) -> TranscriptionResult {
    let segments = DEMO_TRANSCRIPT
        .lines()
        .zip(0u32..)
        .filter_map(|(line, i)| {
            let (speaker, text) = line.split_once(": ")?;
            let start = f64::from(i) * 6.0;
            Some(SpeakerTurn {
                speaker: speaker.to_lowercase(),
                start_secs: start,
                end_secs: start + 6.0,
                text: text.to_string(),
            })
        })
        .collect::<Vec<_>>();
    let duration = segments.last().map(|s| s.end_secs);
    TranscriptionResult {
        text: DEMO_TRANSCRIPT.to_string(),
        confidence: Some(1.0),
        language: language.to_string(),
        duration_secs: duration,
        segments,
        provider: "template".to_string(),
    }
}
