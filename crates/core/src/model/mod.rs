mod ai_settings;
mod ids;
mod progress;
mod syllabus;
mod topic;

pub use ai_settings::{
    AiSettings, AiSettingsDraft, AiSettingsError, DEFAULT_AI_BASE_URL, DEFAULT_AI_MODEL,
};
pub use ids::{ParseTopicIdError, TopicId};
pub use progress::{ProgressAggregate, TopicUpdate, UserProgress};
pub use syllabus::{Incidence, Mission, Syllabus, SyllabusError, SyllabusTopic, WeeklyPlan};
pub use topic::{TopicField, TopicProgress};
