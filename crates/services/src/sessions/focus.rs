use study_core::model::{TopicId, TopicUpdate};
use study_core::timer::{
    IntervalCompleted, IntervalTimer, PendingCommit, TimerConfig, TimerError, TimerMode,
};

use crate::progress_store::ProgressStore;

/// A focus session: the interval timer plus the commit offer it produces.
///
/// When a work interval finishes with a topic selected, the completed minutes
/// are held as a [`PendingCommit`] until the user commits them to the
/// progress store or dismisses them. At most one offer exists at a time.
#[derive(Debug, Clone, Default)]
pub struct FocusSession {
    timer: IntervalTimer,
    pending: Option<PendingCommit>,
}

impl FocusSession {
    #[must_use]
    pub fn new(config: TimerConfig) -> Self {
        Self {
            timer: IntervalTimer::new(config),
            pending: None,
        }
    }

    #[must_use]
    pub fn timer(&self) -> &IntervalTimer {
        &self.timer
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingCommit> {
        self.pending.as_ref()
    }

    pub fn select_topic(&mut self, topic: TopicId) {
        tracing::debug!(topic = %topic, "topic selected");
        self.timer.select_topic(topic);
    }

    /// # Errors
    ///
    /// Returns `TimerError::NoTopicSelected` when starting work without a topic.
    pub fn start(&mut self) -> Result<(), TimerError> {
        self.timer.start()
    }

    pub fn pause(&mut self) {
        self.timer.pause();
    }

    /// # Errors
    ///
    /// Same as [`FocusSession::start`].
    pub fn toggle(&mut self) -> Result<bool, TimerError> {
        self.timer.toggle()
    }

    pub fn reset(&mut self) {
        self.timer.reset();
    }

    /// Change an interval length; ignored while the timer runs.
    pub fn adjust_config(&mut self, mode: TimerMode, delta_minutes: i32) -> bool {
        self.timer.adjust_config(mode, delta_minutes)
    }

    /// Feed elapsed seconds to the timer.
    ///
    /// A finished work interval stores its commit offer, replacing any offer
    /// still unresolved.
    pub fn on_elapsed(&mut self, seconds: u32) -> Option<IntervalCompleted> {
        let completed = self.timer.on_elapsed(seconds)?;
        tracing::info!(
            finished = %completed.finished,
            next = %self.timer.mode(),
            "interval finished"
        );

        if let Some(offer) = &completed.pending {
            if let Some(old) = self.pending.replace(offer.clone()) {
                tracing::info!(
                    topic = %old.topic_id(),
                    minutes = old.minutes_completed(),
                    "unresolved session offer replaced"
                );
            }
        }
        Some(completed)
    }

    /// Log the pending minutes against their topic.
    ///
    /// Consumes the offer, so a second call is a no-op returning `None`.
    pub fn commit(&mut self, store: &mut ProgressStore) -> Option<TopicUpdate> {
        let offer = self.pending.take()?;
        store.add_study_minutes(offer.topic_id(), i64::from(offer.minutes_completed()))
    }

    /// Drop the pending offer without touching progress.
    pub fn dismiss(&mut self) -> Option<PendingCommit> {
        let offer = self.pending.take();
        if let Some(offer) = &offer {
            tracing::debug!(topic = %offer.topic_id(), "session offer dismissed");
        }
        offer
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storage::InMemorySnapshotRepository;
    use study_core::model::TopicField;
    use study_core::time::fixed_clock;

    use super::*;

    fn econ() -> TopicId {
        TopicId::new("econ-1")
    }

    async fn store() -> ProgressStore {
        ProgressStore::open(Arc::new(InMemorySnapshotRepository::new()), fixed_clock(), 11).await
    }

    fn finish_work(session: &mut FocusSession) -> IntervalCompleted {
        session.start().unwrap();
        let secs = session.timer().remaining_secs();
        session.on_elapsed(secs).unwrap()
    }

    #[tokio::test]
    async fn commit_adds_minutes_and_xp() {
        let mut store = store().await;
        store.add_study_minutes(&econ(), 10);
        store.set_topic_field(&econ(), TopicField::TheoryRead(true));
        store.set_topic_field(&econ(), TopicField::TheoryRead(false));
        store.set_topic_field(&econ(), TopicField::TheoryRead(true));
        store.set_topic_field(&econ(), TopicField::FlashcardsDone(true));
        assert_eq!(store.progress().xp(), 135);

        let mut session = FocusSession::new(TimerConfig::new(25, 5));
        session.select_topic(econ());
        let completed = finish_work(&mut session);
        assert_eq!(completed.finished, TimerMode::Work);
        assert_eq!(session.pending().map(PendingCommit::minutes_completed), Some(25));

        let update = session.commit(&mut store).unwrap();
        assert_eq!(update.progress.study_minutes(), 35);
        assert_eq!(update.xp.awarded, 12);
        assert_eq!(store.progress().xp(), 147);
        assert!(session.pending().is_none());
        assert!(session.commit(&mut store).is_none());
    }

    #[tokio::test]
    async fn commit_can_level_up() {
        let mut store = store().await;
        for _ in 0..3 {
            store.set_topic_field(&econ(), TopicField::TheoryRead(false));
            store.set_topic_field(&econ(), TopicField::TheoryRead(true));
        }
        store.set_topic_field(&econ(), TopicField::FlashcardsDone(true));
        store.add_study_minutes(&TopicId::new("geo-1"), 30);
        assert_eq!(store.progress().xp(), 195);

        let mut session = FocusSession::new(TimerConfig::new(25, 5));
        session.select_topic(econ());
        finish_work(&mut session);
        let update = session.commit(&mut store).unwrap();

        assert_eq!(update.xp.state.level(), 2);
        assert_eq!(update.xp.state.xp(), 7);
        assert!(update.xp.leveled_up());
    }

    #[tokio::test]
    async fn dismiss_leaves_progress_untouched() {
        let mut store = store().await;
        let before = store.progress().clone();

        let mut session = FocusSession::new(TimerConfig::new(1, 1));
        session.select_topic(econ());
        finish_work(&mut session);

        let dismissed = session.dismiss().unwrap();
        assert_eq!(dismissed.topic_id(), &econ());
        assert!(session.commit(&mut store).is_none());
        assert_eq!(store.progress(), &before);
    }

    #[test]
    fn break_completion_creates_no_offer() {
        let mut session = FocusSession::new(TimerConfig::new(1, 1));
        session.select_topic(econ());
        finish_work(&mut session);
        session.dismiss();

        session.start().unwrap();
        let completed = session.on_elapsed(60).unwrap();
        assert_eq!(completed.finished, TimerMode::Break);
        assert!(completed.pending.is_none());
        assert!(session.pending().is_none());
        assert_eq!(session.timer().mode(), TimerMode::Work);
    }

    #[test]
    fn newer_offer_replaces_unresolved_one() {
        let mut session = FocusSession::new(TimerConfig::new(1, 1));
        session.select_topic(econ());
        finish_work(&mut session);

        session.start().unwrap();
        session.on_elapsed(60);
        session.select_topic(TopicId::new("geo-1"));
        finish_work(&mut session);

        assert_eq!(session.pending().map(|p| p.topic_id().as_str()), Some("geo-1"));
    }

    #[test]
    fn starting_work_without_topic_is_rejected() {
        let mut session = FocusSession::default();
        assert_eq!(session.start(), Err(TimerError::NoTopicSelected));
        assert!(!session.timer().is_running());
    }
}
