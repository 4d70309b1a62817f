mod client;
mod service;

pub use client::{ChatCompletionsClient, GenerationRequest, TextGeneration};
pub use service::{
    DOSSIER_FALLBACK_HIGHLIGHTS, Dossier, DossierHighlight, DossierSource, EXPLAIN_FALLBACK,
    EssayCorrection, MentorService, PracticeQuestion, SCHEDULE_FALLBACK, progress_context,
};
