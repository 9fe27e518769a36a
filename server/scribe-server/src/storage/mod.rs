pub mod audio_store;

pub use audio_store::{is_allowed_audio_type, AudioStore, ALLOWED_AUDIO_TYPES};
