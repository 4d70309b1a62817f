use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::model::{TopicField, TopicId, TopicProgress};
use crate::progression::{ESSAY_SUBMISSION_XP, LevelState, XpGain, study_minutes_xp};

/// Authoritative progress of the single local user.
///
/// Topics without any recorded activity are absent from the map; an entry is
/// created with defaults by the first write that targets it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserProgress {
    level: LevelState,
    submissions_count: u32,
    topics: BTreeMap<TopicId, TopicProgress>,
}

/// Outcome of a topic write: the updated entry and the XP it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicUpdate {
    pub topic_id: TopicId,
    pub progress: TopicProgress,
    pub xp: XpGain,
}

/// Read-side projection over all topics. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressAggregate {
    pub total_study_minutes: u64,
    pub theory_read_count: usize,
    /// Mean accuracy over topics with at least one answered question.
    pub mean_accuracy: f64,
    /// Topics with theory read divided by the syllabus size.
    pub coverage_ratio: f64,
}

impl ProgressAggregate {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_hours(&self) -> f64 {
        self.total_study_minutes as f64 / 60.0
    }

    /// Coverage as a whole percentage, rounded to nearest.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn coverage_percent(&self) -> u32 {
        (self.coverage_ratio * 100.0).round() as u32
    }
}

impl UserProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate from persisted parts.
    #[must_use]
    pub fn from_persisted(
        level: LevelState,
        submissions_count: u32,
        topics: BTreeMap<TopicId, TopicProgress>,
    ) -> Self {
        Self {
            level,
            submissions_count,
            topics,
        }
    }

    #[must_use]
    pub fn level_state(&self) -> LevelState {
        self.level
    }

    #[must_use]
    pub fn xp(&self) -> u64 {
        self.level.xp()
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level.level()
    }

    #[must_use]
    pub fn submissions_count(&self) -> u32 {
        self.submissions_count
    }

    #[must_use]
    pub fn topic(&self, id: &TopicId) -> Option<&TopicProgress> {
        self.topics.get(id)
    }

    pub fn topics(&self) -> impl Iterator<Item = (&TopicId, &TopicProgress)> {
        self.topics.iter()
    }

    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Write one field of a topic, creating the entry if needed, and award
    /// whatever XP the write earns.
    pub fn set_topic_field(
        &mut self,
        id: &TopicId,
        field: TopicField,
        now: DateTime<Utc>,
    ) -> TopicUpdate {
        let entry = self.topics.entry(id.clone()).or_default();
        let award = entry.apply(field, now);
        let progress = entry.clone();
        let xp = self.level.add_xp(award);

        TopicUpdate {
            topic_id: id.clone(),
            progress,
            xp,
        }
    }

    /// Log study minutes against a topic.
    ///
    /// Returns `None` without touching anything (not even creating the entry)
    /// when `minutes <= 0`. Values above `u32::MAX` are clamped to it.
    pub fn add_study_minutes(
        &mut self,
        id: &TopicId,
        minutes: i64,
        now: DateTime<Utc>,
    ) -> Option<TopicUpdate> {
        if minutes <= 0 {
            return None;
        }
        let minutes = u32::try_from(minutes).unwrap_or(u32::MAX);

        let entry = self.topics.entry(id.clone()).or_default();
        entry.add_minutes(minutes, now);
        let progress = entry.clone();
        let xp = self.level.add_xp(study_minutes_xp(minutes));

        Some(TopicUpdate {
            topic_id: id.clone(),
            progress,
            xp,
        })
    }

    /// Count a scored essay and award its XP.
    pub fn record_essay_submission(&mut self) -> XpGain {
        self.submissions_count = self.submissions_count.saturating_add(1);
        self.level.add_xp(ESSAY_SUBMISSION_XP)
    }

    /// Award XP that is not tied to a topic write.
    pub fn add_xp(&mut self, amount: i64) -> XpGain {
        self.level.add_xp(amount)
    }

    /// Compute derived metrics against a syllabus of `syllabus_size` topics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aggregate(&self, syllabus_size: usize) -> ProgressAggregate {
        let total_study_minutes = self
            .topics
            .values()
            .map(|t| u64::from(t.study_minutes()))
            .sum();
        let theory_read_count = self.topics.values().filter(|t| t.theory_read()).count();

        let answered: Vec<f64> = self
            .topics
            .values()
            .filter(|t| t.questions_answered() > 0)
            .map(TopicProgress::accuracy_percent)
            .collect();
        let mean_accuracy = if answered.is_empty() {
            0.0
        } else {
            answered.iter().sum::<f64>() / answered.len() as f64
        };

        let coverage_ratio = if syllabus_size == 0 {
            0.0
        } else {
            theory_read_count as f64 / syllabus_size as f64
        };

        ProgressAggregate {
            total_study_minutes,
            theory_read_count,
            mean_accuracy,
            coverage_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn econ() -> TopicId {
        TopicId::new("econ-1")
    }

    #[test]
    fn new_progress_has_no_topics() {
        let progress = UserProgress::new();
        assert_eq!(progress.topic_count(), 0);
        assert_eq!(progress.level(), 1);
        assert_eq!(progress.xp(), 0);
    }

    #[test]
    fn non_positive_minutes_do_not_create_entries() {
        let mut progress = UserProgress::new();
        assert!(progress.add_study_minutes(&econ(), 0, fixed_now()).is_none());
        assert!(progress.add_study_minutes(&econ(), -15, fixed_now()).is_none());
        assert!(progress.topic(&econ()).is_none());
    }

    #[test]
    fn non_positive_minutes_leave_existing_total() {
        let mut progress = UserProgress::new();
        progress.add_study_minutes(&econ(), 10, fixed_now());
        progress.add_study_minutes(&econ(), -3, fixed_now());
        assert_eq!(progress.topic(&econ()).unwrap().study_minutes(), 10);
    }

    #[test]
    fn oversized_minutes_are_clamped() {
        let mut progress = UserProgress::new();
        let update = progress
            .add_study_minutes(&econ(), 5_000_000_000, fixed_now())
            .unwrap();
        assert_eq!(update.progress.study_minutes(), u32::MAX);
        assert_eq!(update.xp.awarded, u64::from(u32::MAX / 2));
        assert_eq!(progress.topic(&econ()).unwrap().study_minutes(), u32::MAX);
    }

    #[test]
    fn study_minutes_award_half_the_minutes() {
        let mut progress = UserProgress::new();
        let update = progress.add_study_minutes(&econ(), 25, fixed_now()).unwrap();
        assert_eq!(update.progress.study_minutes(), 25);
        assert_eq!(update.xp.awarded, 12);
        assert_eq!(progress.xp(), 12);
        assert_eq!(update.progress.last_study_at(), Some(fixed_now()));
    }

    #[test]
    fn toggles_feed_the_level_counters() {
        let mut progress = UserProgress::new();
        progress.set_topic_field(&econ(), TopicField::TheoryRead(true), fixed_now());
        progress.set_topic_field(&econ(), TopicField::TheoryRead(false), fixed_now());
        progress.set_topic_field(&econ(), TopicField::TheoryRead(true), fixed_now());
        progress.set_topic_field(&econ(), TopicField::FlashcardsDone(true), fixed_now());
        assert_eq!(progress.xp(), 130);
    }

    #[test]
    fn essay_submission_counts_and_awards() {
        let mut progress = UserProgress::new();
        progress.record_essay_submission();
        let gain = progress.record_essay_submission();
        assert_eq!(progress.submissions_count(), 2);
        assert_eq!(gain.state.level(), 2);
        assert_eq!(progress.xp(), 0);
    }

    #[test]
    fn aggregate_over_empty_progress_is_zero() {
        let agg = UserProgress::new().aggregate(0);
        assert_eq!(agg, ProgressAggregate::default());
    }

    #[test]
    fn aggregate_derives_metrics() {
        let mut progress = UserProgress::new();
        let now = fixed_now();
        let a = TopicId::new("a");
        let b = TopicId::new("b");
        let c = TopicId::new("c");

        progress.set_topic_field(&a, TopicField::TheoryRead(true), now);
        progress.set_topic_field(&a, TopicField::QuestionsAnswered(10), now);
        progress.set_topic_field(&a, TopicField::AccuracyPercent(80.0), now);
        progress.set_topic_field(&b, TopicField::QuestionsAnswered(4), now);
        progress.set_topic_field(&b, TopicField::AccuracyPercent(60.0), now);
        // Accuracy without answered questions does not count.
        progress.set_topic_field(&c, TopicField::AccuracyPercent(10.0), now);
        progress.add_study_minutes(&a, 50, now);
        progress.add_study_minutes(&c, 40, now);

        let agg = progress.aggregate(4);
        assert_eq!(agg.total_study_minutes, 90);
        assert_eq!(agg.theory_read_count, 1);
        assert!((agg.mean_accuracy - 70.0).abs() < 1e-9);
        assert!((agg.coverage_ratio - 0.25).abs() < 1e-9);
        assert_eq!(agg.coverage_percent(), 25);
        assert!((agg.total_hours() - 1.5).abs() < 1e-9);
    }
}
