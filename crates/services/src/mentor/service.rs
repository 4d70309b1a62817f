use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use study_core::model::{Incidence, Syllabus, UserProgress};

use crate::error::GenerationError;
use crate::mentor::client::{GenerationRequest, TextGeneration};

pub const EXPLAIN_FALLBACK: &str = "Desculpe, não consegui explicar este assunto agora.";
pub const SCHEDULE_FALLBACK: &str = "Desculpe, não consegui gerar o cronograma estratégico agora.";

const PLAIN_TEXT_RULES: &str = "Não use markdown (asteriscos, hashtags ou sublinhados). \
Use apenas texto simples, letras maiúsculas para ênfase e hifens para listas.";

const GRADER_SYSTEM: &str = "Você é o corretor oficial das provas discursivas do CACD. \
Atribua nota de 0.00 a 10.00 com duas casas decimais e seja rigoroso: textos medianos \
ficam entre 5.50 e 6.50, textos ruins abaixo de 3.00. Justifique pela estrutura, \
profundidade conceitual, autores, tratados e linguagem diplomática. Escreva uma resposta \
modelo nota 10 e um plano de melhoria de 5 a 7 itens. Responda somente com um objeto JSON \
com os campos score, justification, errors, omissions, highlights, bankGrade, \
approvedGrade, modelResponse e improvementPlan.";

const EXAMINER_SYSTEM: &str = "Você elabora provas do CACD. Responda somente com um objeto \
JSON com os campos topic, command, lines e subject.";

const ANALYST_SYSTEM: &str = "Analista do MRE. SEM MARKDOWN. Responda somente com um objeto \
JSON com os campos current, previous, highlights (lista de objetos com text e url opcional) \
e sources (lista de objetos com title e uri).";

/// Headlines shown when the weekly dossier cannot be fetched.
pub const DOSSIER_FALLBACK_HIGHLIGHTS: [&str; 3] = [
    "Itamaraty monitora cúpulas regionais",
    "Acordos de cooperação em debate no G20",
    "Brasil amplia presença em fóruns multilaterais",
];

/// Graded essay returned by [`MentorService::score_essay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayCorrection {
    /// In `[0, 10]`.
    pub score: f64,
    pub justification: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub omissions: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    /// Average grade the exam board gives to this kind of answer.
    pub bank_grade: f64,
    /// Average grade of approved candidates.
    pub approved_grade: f64,
    pub model_response: String,
    #[serde(default)]
    pub improvement_plan: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeQuestion {
    pub topic: String,
    pub command: String,
    /// Expected answer length in lines.
    #[serde(deserialize_with = "whole_lines")]
    pub lines: u32,
    pub subject: String,
}

/// Weekly summary of Brazilian foreign-policy news.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dossier {
    /// This week's summary.
    #[serde(default)]
    pub current: String,
    /// Last week's summary.
    #[serde(default)]
    pub previous: String,
    #[serde(default)]
    pub highlights: Vec<DossierHighlight>,
    #[serde(default)]
    pub sources: Vec<DossierSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DossierHighlight {
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DossierSource {
    pub title: String,
    pub uri: String,
}

impl Dossier {
    /// The fixed headlines, with no summaries or sources.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            highlights: DOSSIER_FALLBACK_HIGHLIGHTS
                .iter()
                .map(|text| DossierHighlight {
                    text: (*text).to_owned(),
                    url: None,
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Drop repeated source links and give each highlight without a link the
    /// source at the same position.
    fn link_sources(mut self) -> Self {
        let mut seen = HashSet::new();
        let sources: Vec<DossierSource> = self
            .sources
            .into_iter()
            .filter(|source| !source.uri.trim().is_empty())
            .collect();

        for (highlight, source) in self.highlights.iter_mut().zip(&sources) {
            if highlight.url.as_deref().is_none_or(|url| url.trim().is_empty()) {
                highlight.url = Some(source.uri.clone());
            }
        }
        self.highlights.retain(|h| !h.text.trim().is_empty());
        self.sources = sources
            .into_iter()
            .filter(|source| seen.insert(source.uri.clone()))
            .collect();
        self
    }
}

/// Typed operations over the text-generation collaborator.
///
/// Cheap to clone; results can be awaited on a separate task so a slow call
/// never holds up the timer or progress updates.
#[derive(Clone)]
pub struct MentorService {
    generator: Arc<dyn TextGeneration>,
}

impl MentorService {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGeneration>) -> Self {
        Self { generator }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.generator.enabled()
    }

    /// Grade an essay written for `topic`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` if the call fails or the reply is not a
    /// correction with a score in `[0, 10]`. The reference grades are clamped
    /// to that range instead.
    pub async fn score_essay(
        &self,
        topic: &str,
        essay: &str,
    ) -> Result<EssayCorrection, GenerationError> {
        let request = GenerationRequest {
            system: GRADER_SYSTEM.to_owned(),
            prompt: format!("Tema: {topic}\n\nResposta do aluno: {essay}"),
            json: true,
        };
        let mut correction: EssayCorrection = self.generate_json(request).await?;

        if !(0.0..=10.0).contains(&correction.score) {
            return Err(GenerationError::InvalidResponse(format!(
                "score {} is outside 0..=10",
                correction.score
            )));
        }
        correction.bank_grade = clamp_grade(correction.bank_grade);
        correction.approved_grade = clamp_grade(correction.approved_grade);
        Ok(correction)
    }

    /// Draft a new essay question about `subject`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` if the call fails or the reply is not a question.
    pub async fn generate_question(
        &self,
        subject: &str,
    ) -> Result<PracticeQuestion, GenerationError> {
        let request = GenerationRequest {
            system: EXAMINER_SYSTEM.to_owned(),
            prompt: format!(
                "Gere uma questão discursiva inédita, padrão CACD, sobre: {subject}. \
                 O comando deve exigir análise histórica ou política aprofundada."
            ),
            json: true,
        };
        let question: PracticeQuestion = self.generate_json(request).await?;
        if question.command.trim().is_empty() {
            return Err(GenerationError::InvalidResponse("question has no command".into()));
        }
        Ok(question)
    }

    /// Explain a syllabus topic. Falls back to [`EXPLAIN_FALLBACK`] on any failure.
    pub async fn explain_topic(&self, subject: &str, subtopic: &str) -> String {
        let request = GenerationRequest {
            system: format!("Você é um mentor experiente do CACD. {PLAIN_TEXT_RULES}"),
            prompt: format!(
                "Explique de forma estratégica para o CACD: {subject} - {subtopic}. \
                 Foque em conceitos-chave e autores."
            ),
            json: false,
        };
        self.generate_or(request, EXPLAIN_FALLBACK).await
    }

    /// Plan the remaining study days. Falls back to [`SCHEDULE_FALLBACK`] on any failure.
    pub async fn generate_study_schedule(&self, days_remaining: u32, context: &str) -> String {
        let request = GenerationRequest {
            system: format!("Você é um estrategista de estudos para o CACD. {PLAIN_TEXT_RULES}"),
            prompt: format!(
                "Crie um cronograma de estudos para o CACD.\n\
                 Dias restantes: {days_remaining}.\n\
                 Progresso atual: {context}\n\
                 Priorize tópicos de alta incidência ainda não lidos."
            ),
            json: false,
        };
        self.generate_or(request, SCHEDULE_FALLBACK).await
    }

    /// Fetch the weekly news dossier for `today` (as `dd/mm/yyyy`).
    ///
    /// Any failure, or a reply without highlights, yields
    /// [`Dossier::fallback`].
    pub async fn weekly_dossier(&self, today: &str) -> Dossier {
        let request = GenerationRequest {
            system: ANALYST_SYSTEM.to_owned(),
            prompt: format!(
                "Compilado Diplomático Brasileiro. DATA: {today}. Resuma os posicionamentos \
                 do Brasil em cúpulas, acordos e crises desta semana e da anterior. Foque no \
                 que é relevante para o CACD. Extraia 3 fatos curtíssimos para destaques \
                 rápidos e inclua o link real da notícia quando houver."
            ),
            json: true,
        };
        match self.generate_json::<Dossier>(request).await {
            Ok(dossier) => {
                let dossier = dossier.link_sources();
                if dossier.highlights.is_empty() {
                    tracing::warn!("dossier reply had no highlights; using fallback");
                    return Dossier::fallback();
                }
                dossier
            }
            Err(err) => {
                tracing::warn!(error = %err, "dossier generation failed; using fallback");
                Dossier::fallback()
            }
        }
    }

    async fn generate_or(&self, request: GenerationRequest, fallback: &str) -> String {
        match self.generator.generate(request).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "text generation failed; using fallback");
                fallback.to_owned()
            }
        }
    }

    async fn generate_json<T: DeserializeOwned>(
        &self,
        request: GenerationRequest,
    ) -> Result<T, GenerationError> {
        let raw = self.generator.generate(request).await?;
        serde_json::from_str(strip_code_fence(&raw))
            .map_err(|err| GenerationError::InvalidResponse(err.to_string()))
    }
}

/// Summary of the user's progress used as schedule context.
#[must_use]
pub fn progress_context(syllabus: &Syllabus, progress: &UserProgress) -> String {
    let aggregate = progress.aggregate(syllabus.len());
    let mut context = format!(
        "nível {}, {} de {} tópicos lidos, {:.1} horas estudadas, acurácia média {:.0}%.",
        progress.level(),
        aggregate.theory_read_count,
        syllabus.len(),
        aggregate.total_hours(),
        aggregate.mean_accuracy,
    );

    let unread: Vec<&str> = syllabus
        .topics()
        .filter(|t| t.incidence == Incidence::High)
        .filter(|t| !progress.topic(&t.id).is_some_and(|p| p.theory_read()))
        .map(|t| t.subtopic.as_str())
        .collect();
    if !unread.is_empty() {
        let _ = write!(context, " Alta incidência pendente: {}.", unread.join(", "));
    }
    context
}

/// Non-finite grades become 0.
fn clamp_grade(grade: f64) -> f64 {
    if grade.is_finite() {
        grade.clamp(0.0, 10.0)
    } else {
        0.0
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_lines<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    Ok(raw.round().clamp(0.0, f64::from(u32::MAX)) as u32)
}

/// Models sometimes wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
