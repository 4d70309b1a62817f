use chrono::{DateTime, Utc};

use crate::progression::{FLASHCARDS_DONE_XP, THEORY_READ_XP};

/// Study progress recorded for one syllabus topic.
///
/// Numeric fields are clamped on write and never rejected: counters floor at
/// zero and accuracy is kept within `0..=100`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopicProgress {
    theory_read: bool,
    flashcards_done: bool,
    questions_answered: u32,
    accuracy_percent: f64,
    study_minutes: u32,
    last_study_at: Option<DateTime<Utc>>,
}

/// A single field write requested by the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopicField {
    TheoryRead(bool),
    FlashcardsDone(bool),
    QuestionsAnswered(i64),
    AccuracyPercent(f64),
    /// Explicit overwrite of the study minutes total.
    StudyMinutes(i64),
}

impl TopicField {
    /// Short name used in logs and console commands.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TopicField::TheoryRead(_) => "theory",
            TopicField::FlashcardsDone(_) => "flashcards",
            TopicField::QuestionsAnswered(_) => "questions",
            TopicField::AccuracyPercent(_) => "accuracy",
            TopicField::StudyMinutes(_) => "minutes",
        }
    }
}

impl TopicProgress {
    /// Rehydrate a topic from a snapshot, clamping values into range.
    #[must_use]
    pub fn from_persisted(
        theory_read: bool,
        flashcards_done: bool,
        questions_answered: u32,
        accuracy_percent: f64,
        study_minutes: u32,
        last_study_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            theory_read,
            flashcards_done,
            questions_answered,
            accuracy_percent: clamp_accuracy(accuracy_percent),
            study_minutes,
            last_study_at,
        }
    }

    #[must_use]
    pub fn theory_read(&self) -> bool {
        self.theory_read
    }

    #[must_use]
    pub fn flashcards_done(&self) -> bool {
        self.flashcards_done
    }

    #[must_use]
    pub fn questions_answered(&self) -> u32 {
        self.questions_answered
    }

    #[must_use]
    pub fn accuracy_percent(&self) -> f64 {
        self.accuracy_percent
    }

    #[must_use]
    pub fn study_minutes(&self) -> u32 {
        self.study_minutes
    }

    #[must_use]
    pub fn last_study_at(&self) -> Option<DateTime<Utc>> {
        self.last_study_at
    }

    /// Apply a field write and return the XP it earns.
    ///
    /// Only a false→true flip of `theory_read` or `flashcards_done` earns XP
    /// and stamps `last_study_at`; flipping back earns nothing and keeps the
    /// stamp. Numeric writes stamp the time when the new value is positive.
    pub fn apply(&mut self, field: TopicField, now: DateTime<Utc>) -> i64 {
        match field {
            TopicField::TheoryRead(value) => {
                let became_active = value && !self.theory_read;
                self.theory_read = value;
                self.stamp_if(became_active, now);
                if became_active { THEORY_READ_XP } else { 0 }
            }
            TopicField::FlashcardsDone(value) => {
                let became_active = value && !self.flashcards_done;
                self.flashcards_done = value;
                self.stamp_if(became_active, now);
                if became_active { FLASHCARDS_DONE_XP } else { 0 }
            }
            TopicField::QuestionsAnswered(value) => {
                self.questions_answered = clamp_count(value);
                self.stamp_if(self.questions_answered > 0, now);
                0
            }
            TopicField::AccuracyPercent(value) => {
                self.accuracy_percent = clamp_accuracy(value);
                self.stamp_if(self.accuracy_percent > 0.0, now);
                0
            }
            TopicField::StudyMinutes(value) => {
                self.study_minutes = clamp_count(value);
                self.stamp_if(self.study_minutes > 0, now);
                0
            }
        }
    }

    /// Add logged minutes. Returns `false` (and changes nothing) for `minutes == 0`.
    pub fn add_minutes(&mut self, minutes: u32, now: DateTime<Utc>) -> bool {
        if minutes == 0 {
            return false;
        }
        self.study_minutes = self.study_minutes.saturating_add(minutes);
        self.last_study_at = Some(now);
        true
    }

    fn stamp_if(&mut self, active: bool, now: DateTime<Utc>) {
        if active {
            self.last_study_at = Some(now);
        }
    }
}

fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn clamp_accuracy(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}
