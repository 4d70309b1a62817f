use std::collections::HashSet;

use chrono::Weekday;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{TopicId, UserProgress};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SyllabusError {
    #[error("duplicate topic id in syllabus: {0}")]
    DuplicateTopic(TopicId),
}

/// How often a topic shows up in past exams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Incidence {
    #[serde(alias = "Alta")]
    High,
    #[serde(alias = "Média", alias = "Media")]
    Medium,
    #[serde(alias = "Baixa")]
    Low,
}

/// One atomic unit of the syllabus. Owned by external data, read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyllabusTopic {
    pub id: TopicId,
    pub subject: String,
    pub subtopic: String,
    pub incidence: Incidence,
}

/// Ordered list of topics with unique ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Syllabus {
    topics: Vec<SyllabusTopic>,
}

impl Syllabus {
    /// Build a syllabus, keeping the given order.
    ///
    /// # Errors
    ///
    /// Returns `SyllabusError::DuplicateTopic` if two topics share an id.
    pub fn new(topics: Vec<SyllabusTopic>) -> Result<Self, SyllabusError> {
        let mut seen = HashSet::with_capacity(topics.len());
        for topic in &topics {
            if !seen.insert(&topic.id) {
                return Err(SyllabusError::DuplicateTopic(topic.id.clone()));
            }
        }
        Ok(Self { topics })
    }

    /// Small built-in syllabus used when no syllabus file is configured.
    #[must_use]
    pub fn sample() -> Self {
        fn topic(id: &str, subject: &str, subtopic: &str, incidence: Incidence) -> SyllabusTopic {
            SyllabusTopic {
                id: TopicId::new(id),
                subject: subject.to_owned(),
                subtopic: subtopic.to_owned(),
                incidence,
            }
        }

        Self {
            topics: vec![
                topic("econ-1", "Economia", "Contas nacionais", Incidence::High),
                topic("econ-2", "Economia", "Balanço de pagamentos", Incidence::High),
                topic("hist-br-1", "História do Brasil", "Período joanino", Incidence::Medium),
                topic("hist-mun-1", "História Mundial", "Congresso de Viena", Incidence::High),
                topic("pol-int-1", "Política Internacional", "Multilateralismo", Incidence::High),
                topic("geo-1", "Geografia", "Geopolítica da Amazônia", Incidence::Medium),
                topic("dir-int-1", "Direito Internacional Público", "Fontes", Incidence::High),
                topic("dir-const-1", "Direito Constitucional", "Poder Executivo", Incidence::Low),
                topic("port-1", "Língua Portuguesa", "Coesão textual", Incidence::Medium),
                topic("ing-1", "Língua Inglesa", "Summary writing", Incidence::Medium),
                topic("fra-1", "Língua Francesa", "Résumé", Incidence::Low),
            ],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &TopicId) -> Option<&SyllabusTopic> {
        self.topics.iter().find(|t| &t.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &TopicId) -> bool {
        self.get(id).is_some()
    }

    pub fn topics(&self) -> impl Iterator<Item = &SyllabusTopic> {
        self.topics.iter()
    }
}

//
// ─── WEEKLY MISSIONS ───────────────────────────────────────────────────────────
//

/// Subjects to work on for each day of the week.
///
/// A planned subject matches any syllabus subject that starts with it, so
/// `"Direito"` covers every law subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyPlan {
    /// Indexed by `Weekday::num_days_from_monday`.
    days: [Vec<String>; 7],
}

/// Today's suggestion for one planned subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mission<'a> {
    pub subject: &'a str,
    /// First topic of the subject whose theory is still unread; `None` once
    /// the whole subject is covered.
    pub topic: Option<&'a SyllabusTopic>,
}

impl Default for WeeklyPlan {
    fn default() -> Self {
        fn day(subjects: &[&str]) -> Vec<String> {
            subjects.iter().map(|s| (*s).to_owned()).collect()
        }

        Self {
            days: [
                day(&["Economia", "Língua Inglesa", "História do Brasil"]),
                day(&["Direito", "Língua Portuguesa", "Política Internacional"]),
                day(&["História Mundial", "Economia", "Língua Francesa"]),
                day(&["Direito", "Geografia", "Língua Portuguesa"]),
                day(&["Política Internacional", "História Mundial", "Economia"]),
                day(&["Língua Inglesa", "História do Brasil", "Direito"]),
                Vec::new(),
            ],
        }
    }
}

impl WeeklyPlan {
    #[must_use]
    pub fn subjects_for(&self, weekday: Weekday) -> &[String] {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    /// Missions for `weekday`, skipping topics whose theory is already read.
    #[must_use]
    pub fn missions<'a>(
        &'a self,
        weekday: Weekday,
        syllabus: &'a Syllabus,
        progress: &UserProgress,
    ) -> Vec<Mission<'a>> {
        self.subjects_for(weekday)
            .iter()
            .map(|subject| Mission {
                subject,
                topic: syllabus.topics().find(|t| {
                    t.subject.starts_with(subject.as_str())
                        && !progress.topic(&t.id).is_some_and(|p| p.theory_read())
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TopicField;
    use crate::time::fixed_now;

    #[test]
    fn sample_syllabus_has_unique_ids() {
        let sample = Syllabus::sample();
        let rebuilt = Syllabus::new(sample.topics().cloned().collect());
        assert_eq!(rebuilt, Ok(sample));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let topic = Syllabus::sample().topics().next().cloned().unwrap();
        let err = Syllabus::new(vec![topic.clone(), topic]).unwrap_err();
        assert_eq!(err, SyllabusError::DuplicateTopic(TopicId::new("econ-1")));
    }

    #[test]
    fn sunday_has_no_missions() {
        let plan = WeeklyPlan::default();
        let syllabus = Syllabus::sample();
        assert!(plan.missions(Weekday::Sun, &syllabus, &UserProgress::new()).is_empty());
    }

    #[test]
    fn missions_skip_read_topics_and_match_subject_prefix() {
        let plan = WeeklyPlan::default();
        let syllabus = Syllabus::sample();
        let mut progress = UserProgress::new();

        let missions = plan.missions(Weekday::Tue, &syllabus, &progress);
        assert_eq!(missions.len(), 3);
        assert_eq!(missions[0].subject, "Direito");
        assert_eq!(missions[0].topic.map(|t| t.id.as_str()), Some("dir-int-1"));

        progress.set_topic_field(
            &TopicId::new("dir-int-1"),
            TopicField::TheoryRead(true),
            fixed_now(),
        );
        let missions = plan.missions(Weekday::Tue, &syllabus, &progress);
        assert_eq!(missions[0].topic.map(|t| t.id.as_str()), Some("dir-const-1"));

        progress.set_topic_field(
            &TopicId::new("dir-const-1"),
            TopicField::TheoryRead(true),
            fixed_now(),
        );
        let missions = plan.missions(Weekday::Tue, &syllabus, &progress);
        assert!(missions[0].topic.is_none());
    }
}
