use thiserror::Error;
use url::Url;

pub const DEFAULT_AI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";

/// Validated connection settings for the remote text-generation service.
///
/// The service is considered enabled only when an API key is present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AiSettings {
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Clone, Debug, Default)]
pub struct AiSettingsDraft {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AiSettingsError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl AiSettingsDraft {
    /// Validate and normalize the draft.
    ///
    /// Blank values fall back to defaults; a blank key disables the service.
    ///
    /// # Errors
    ///
    /// Returns `AiSettingsError::InvalidBaseUrl` if a base URL is given but is
    /// not an absolute http(s) URL.
    pub fn validate(self) -> Result<AiSettings, AiSettingsError> {
        let api_key = normalize_optional(self.api_key);
        let model = normalize_optional(self.model).unwrap_or_else(|| DEFAULT_AI_MODEL.to_owned());
        let base_url = match normalize_optional(self.base_url) {
            Some(raw) => {
                let parsed =
                    Url::parse(&raw).map_err(|_| AiSettingsError::InvalidBaseUrl(raw.clone()))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(AiSettingsError::InvalidBaseUrl(raw));
                }
                raw.trim_end_matches('/').to_owned()
            }
            None => DEFAULT_AI_BASE_URL.to_owned(),
        };

        Ok(AiSettings {
            api_key,
            base_url,
            model,
        })
    }
}

impl AiSettings {
    /// Settings with no API key: every remote call reports the service as disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_AI_BASE_URL.to_owned(),
            model: DEFAULT_AI_MODEL.to_owned(),
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Default for AiSettings {
    fn default() -> Self {
        Self::disabled()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_draft_is_disabled_with_defaults() {
        let settings = AiSettingsDraft {
            api_key: Some("   ".into()),
            ..AiSettingsDraft::default()
        }
        .validate()
        .unwrap();
        assert!(!settings.enabled());
        assert_eq!(settings.base_url(), DEFAULT_AI_BASE_URL);
        assert_eq!(settings.model(), DEFAULT_AI_MODEL);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let settings = AiSettingsDraft {
            api_key: Some("k".into()),
            base_url: Some("http://localhost:8080/v1/".into()),
            model: None,
        }
        .validate()
        .unwrap();
        assert!(settings.enabled());
        assert_eq!(settings.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn rejects_non_http_urls() {
        for raw in ["not a url", "ftp://example.com"] {
            let err = AiSettingsDraft {
                base_url: Some(raw.into()),
                ..AiSettingsDraft::default()
            }
            .validate()
            .unwrap_err();
            assert_eq!(err, AiSettingsError::InvalidBaseUrl(raw.into()));
        }
    }
}
