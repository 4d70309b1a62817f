use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use study_core::model::AiSettings;

use crate::error::GenerationError;

/// One request to the text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Standing instructions for the model.
    pub system: String,
    pub prompt: String,
    /// Ask for a single JSON object instead of free text.
    pub json: bool,
}

/// Opaque async text generator. Single-shot, no retries.
#[async_trait]
pub trait TextGeneration: Send + Sync {
    fn enabled(&self) -> bool;

    /// Generate text for `request`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the service is disabled, the request
    /// fails, or the response is empty.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    settings: AiSettings,
}

impl ChatCompletionsClient {
    #[must_use]
    pub fn new(settings: AiSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl TextGeneration for ChatCompletionsClient {
    fn enabled(&self) -> bool {
        self.settings.enabled()
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let api_key = self.settings.api_key().ok_or(GenerationError::Disabled)?;

        let url = format!("{}/chat/completions", self.settings.base_url());
        let payload = ChatRequest {
            model: self.settings.model().to_owned(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
            temperature: 0.2,
            response_format: request.json.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        tracing::debug!(
            model = self.settings.model(),
            json = request.json,
            "text generation request"
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_client_fails_without_network() {
        let client = ChatCompletionsClient::new(AiSettings::disabled());
        assert!(!client.enabled());
        let err = client
            .generate(GenerationRequest {
                system: String::new(),
                prompt: "oi".into(),
                json: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Disabled));
    }

    #[test]
    fn json_requests_carry_response_format() {
        let payload = ChatRequest {
            model: "m".into(),
            messages: Vec::new(),
            temperature: 0.2,
            response_format: Some(ResponseFormat { kind: "json_object" }),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");

        let plain = ChatRequest {
            response_format: None,
            ..payload
        };
        let value = serde_json::to_value(&plain).unwrap();
        assert!(value.get("response_format").is_none());
    }
}
