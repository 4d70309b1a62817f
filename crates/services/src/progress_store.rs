use std::sync::Arc;

use storage::{PROGRESS_SNAPSHOT_KEY, ProgressSnapshot, SnapshotRepository};
use study_core::model::{
    ProgressAggregate, TopicField, TopicId, TopicProgress, TopicUpdate, UserProgress,
};
use study_core::progression::XpGain;
use study_core::time::Clock;

use crate::error::PersistenceError;
use crate::persistence::SnapshotWriter;

/// Owner of the user's progress.
///
/// Every mutation updates the in-memory state first, then queues a snapshot
/// write. The in-memory state is authoritative whatever the write outcome;
/// call [`ProgressStore::flush`] to learn about failed writes.
pub struct ProgressStore {
    clock: Clock,
    progress: UserProgress,
    syllabus_size: usize,
    writer: SnapshotWriter,
}

impl ProgressStore {
    /// Load the snapshot from `repo`, or start fresh if it is missing or unreadable.
    ///
    /// Must be called inside a tokio runtime (the snapshot writer is spawned here).
    pub async fn open(
        repo: Arc<dyn SnapshotRepository>,
        clock: Clock,
        syllabus_size: usize,
    ) -> Self {
        let progress = load_or_default(repo.as_ref()).await;
        let writer = SnapshotWriter::spawn(repo, PROGRESS_SNAPSHOT_KEY);
        Self {
            clock,
            progress,
            syllabus_size,
            writer,
        }
    }

    #[must_use]
    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    #[must_use]
    pub fn topic(&self, id: &TopicId) -> Option<&TopicProgress> {
        self.progress.topic(id)
    }

    #[must_use]
    pub fn syllabus_size(&self) -> usize {
        self.syllabus_size
    }

    /// Write a topic field and award the XP it earns.
    pub fn set_topic_field(&mut self, id: &TopicId, field: TopicField) -> TopicUpdate {
        let update = self.progress.set_topic_field(id, field, self.clock.now());
        tracing::debug!(
            topic = %id,
            field = field.name(),
            xp = update.xp.awarded,
            "topic field set"
        );
        self.after_xp(&update.xp);
        self.persist();
        update
    }

    /// Log study minutes against a topic. `minutes <= 0` is a no-op.
    pub fn add_study_minutes(&mut self, id: &TopicId, minutes: i64) -> Option<TopicUpdate> {
        let Some(update) = self.progress.add_study_minutes(id, minutes, self.clock.now()) else {
            tracing::debug!(topic = %id, minutes, "ignored non-positive study minutes");
            return None;
        };
        tracing::debug!(
            topic = %id,
            minutes,
            total = update.progress.study_minutes(),
            "study minutes logged"
        );
        self.after_xp(&update.xp);
        self.persist();
        Some(update)
    }

    /// Count a scored essay and award its XP.
    pub fn record_essay_submission(&mut self) -> XpGain {
        let gain = self.progress.record_essay_submission();
        self.after_xp(&gain);
        self.persist();
        gain
    }

    /// Derived metrics over the current progress.
    #[must_use]
    pub fn aggregate(&self) -> ProgressAggregate {
        self.progress.aggregate(self.syllabus_size)
    }

    /// Wait for queued snapshot writes.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if a write failed since the last flush.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        self.writer.flush().await
    }

    fn after_xp(&self, gain: &XpGain) {
        if let Some(level_up) = gain.level_up {
            tracing::info!(from = level_up.from, to = level_up.to, "level up");
        }
    }

    fn persist(&self) {
        match ProgressSnapshot::from_progress(&self.progress).to_json() {
            Ok(payload) => self.writer.schedule(payload),
            Err(err) => tracing::warn!(error = %err, "cannot encode progress snapshot"),
        }
    }
}

async fn load_or_default(repo: &dyn SnapshotRepository) -> UserProgress {
    let payload = match repo.load(PROGRESS_SNAPSHOT_KEY).await {
        Ok(Some(payload)) => payload,
        Ok(None) => return UserProgress::new(),
        Err(err) => {
            tracing::warn!(error = %err, "cannot read progress snapshot; starting fresh");
            return UserProgress::new();
        }
    };

    match ProgressSnapshot::from_json(&payload) {
        Ok(snapshot) => snapshot.into_progress(),
        Err(err) => {
            tracing::warn!(error = %err, "progress snapshot is corrupt; starting fresh");
            UserProgress::new()
        }
    }
}
