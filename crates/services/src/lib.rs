#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod mentor;
pub mod persistence;
pub mod progress_store;
pub mod sessions;
pub mod syllabus;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use config::AppConfig;
pub use error::{
    AppServicesError, ConfigError, GenerationError, PersistenceError, SyllabusLoadError,
};
pub use mentor::{
    ChatCompletionsClient, Dossier, EssayCorrection, GenerationRequest, MentorService,
    PracticeQuestion, TextGeneration,
};
pub use progress_store::ProgressStore;
pub use sessions::{FocusSession, TickClock, TickPolicy};
