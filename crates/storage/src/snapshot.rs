//! JSON record of the durable progress snapshot.
//!
//! The record mirrors `UserProgress` so the domain never sees serde field
//! names. Every field has a default, so snapshots written by older builds
//! (or with missing keys) still load.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use study_core::model::{TopicId, TopicProgress, UserProgress};
use study_core::progression::LevelState;

use crate::repository::StorageError;

/// Key under which the progress blob is stored.
pub const PROGRESS_SNAPSHOT_KEY: &str = "study_progress_v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressSnapshot {
    pub xp: u64,
    pub level: u32,
    pub submissions_count: u32,
    pub topic_progress: BTreeMap<TopicId, TopicProgressRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopicProgressRecord {
    pub theory_read: bool,
    pub flashcards_done: bool,
    pub questions_answered: u32,
    pub accuracy_percent: f64,
    pub study_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_study_at: Option<DateTime<Utc>>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            submissions_count: 0,
            topic_progress: BTreeMap::new(),
        }
    }
}

impl TopicProgressRecord {
    #[must_use]
    pub fn from_progress(topic: &TopicProgress) -> Self {
        Self {
            theory_read: topic.theory_read(),
            flashcards_done: topic.flashcards_done(),
            questions_answered: topic.questions_answered(),
            accuracy_percent: topic.accuracy_percent(),
            study_minutes: topic.study_minutes(),
            last_study_at: topic.last_study_at(),
        }
    }

    #[must_use]
    pub fn into_progress(self) -> TopicProgress {
        TopicProgress::from_persisted(
            self.theory_read,
            self.flashcards_done,
            self.questions_answered,
            self.accuracy_percent,
            self.study_minutes,
            self.last_study_at,
        )
    }
}

impl ProgressSnapshot {
    #[must_use]
    pub fn from_progress(progress: &UserProgress) -> Self {
        Self {
            xp: progress.xp(),
            level: progress.level(),
            submissions_count: progress.submissions_count(),
            topic_progress: progress
                .topics()
                .map(|(id, topic)| (id.clone(), TopicProgressRecord::from_progress(topic)))
                .collect(),
        }
    }

    /// Convert back into the domain model, repairing out-of-range counters.
    #[must_use]
    pub fn into_progress(self) -> UserProgress {
        UserProgress::from_persisted(
            LevelState::from_persisted(self.xp, self.level),
            self.submissions_count,
            self.topic_progress
                .into_iter()
                .map(|(id, record)| (id, record.into_progress()))
                .collect(),
        )
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the payload is not a valid snapshot.
    pub fn from_json(payload: &str) -> Result<Self, StorageError> {
        serde_json::from_str(payload).map_err(|err| StorageError::Serialization(err.to_string()))
    }
}
