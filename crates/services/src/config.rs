//! Application configuration read from `STUDY_*` environment variables.

use std::path::PathBuf;

use study_core::model::{AiSettings, AiSettingsDraft};
use study_core::timer::TimerConfig;

use crate::error::ConfigError;
use crate::sessions::TickPolicy;

pub const DEFAULT_DB_URL: &str = "sqlite://study.sqlite3";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_url: String,
    /// `None` uses the built-in sample syllabus.
    pub syllabus_path: Option<PathBuf>,
    pub timer: TimerConfig,
    pub tick_policy: TickPolicy,
    pub ai: AiSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_owned(),
            syllabus_path: None,
            timer: TimerConfig::default(),
            tick_policy: TickPolicy::default(),
            ai: AiSettings::disabled(),
        }
    }
}

impl AppConfig {
    /// # Errors
    ///
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup.
    ///
    /// Minute values below 1 are raised to 1. An unusable AI base URL turns
    /// the AI collaborator off instead of failing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a minute value is not a whole number or the
    /// tick policy is unknown.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = TimerConfig::default();

        let work = minutes(&get, "STUDY_WORK_MINUTES", defaults.work_minutes())?;
        let brk = minutes(&get, "STUDY_BREAK_MINUTES", defaults.break_minutes())?;
        let tick_policy = match get("STUDY_TICK_POLICY") {
            Some(raw) => raw.parse()?,
            None => TickPolicy::default(),
        };

        let draft = AiSettingsDraft {
            api_key: get("STUDY_AI_API_KEY"),
            base_url: get("STUDY_AI_BASE_URL"),
            model: get("STUDY_AI_MODEL"),
        };
        let ai = draft.validate().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "AI settings rejected; AI features disabled");
            AiSettings::disabled()
        });

        Ok(Self {
            db_url: get("STUDY_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.to_owned()),
            syllabus_path: get("STUDY_SYLLABUS").map(PathBuf::from),
            timer: TimerConfig::new(work, brk),
            tick_policy,
            ai,
        })
    }
}

fn minutes(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    let Some(raw) = get(var) else {
        return Ok(default);
    };
    let value: i64 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        raw: raw.clone(),
    })?;
    Ok(u32::try_from(value.max(1)).unwrap_or(u32::MAX))
}
