pub mod consultation_pipeline;
pub mod note_review;

pub use consultation_pipeline::{
    ConsultationPipeline, NoteGenerationState, PipelineError, UploadOutcome, UploadRequest,
    UploadedAudio,
};
pub use note_review::{NoteEdit, NoteReviewService, ReviewError, SummaryAudio, TranslationView};
