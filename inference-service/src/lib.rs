//! Inference collaborators for consultation documentation.
//!
//! Four black-box HTTP model services, each optional:
//!
//! - **speech-to-text**: consultation audio to transcript text
//! - **text generation**: SOAP note and patient summary
//! - **translation**: patient summary into another language
//! - **text-to-speech**: patient summary read aloud (WAV)
//!
//! Every call goes through [`InferenceService`], which owns the fallback
//! policy: transcription failures are reported, never raised; note generation
//! falls back to deterministic keyword templates ([`soap::fallback_soap`]);
//! translation returns the original text; speech returns one second of
//! silence. Calls share one fixed timeout and are never retried.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use inference_service::{InferenceConfig, InferenceService, TranscriptionOutcome, TranscriptionRequest};
//!
//! # async fn example(audio: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let service = InferenceService::from_config(InferenceConfig::from_env())?;
//! let request = TranscriptionRequest {
//!     audio,
//!     file_name: "visit.webm".into(),
//!     mime_type: "audio/webm".into(),
//!     language: "en".into(),
//! };
//! if let TranscriptionOutcome::Success(result) = service.transcribe(&request).await {
//!     let note = service.generate_note(&result.text, "Maria Lopez").await;
//!     println!("{}", note.soap.assessment);
//! }
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod medical_vocabulary;
pub mod providers;
pub mod service;
pub mod soap;
pub mod summary;
pub mod transcription;

pub use config::*;
pub use error::*;
pub use medical_vocabulary::*;
pub use providers::{SpeechSynthesizer, SpeechToText, TextGenerator, Translator};
pub use service::*;
pub use soap::SoapNote;
pub use transcription::*;
