//! Gemini `generateContent` client.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Generator, ModelHttpConfig, build_http_client};
use crate::{Error, Result};

/// Gemini chat-completion client.
pub struct GeminiGenerator {
    /// API key.
    api_key: Option<SecretString>,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// Sampling temperature.
    temperature: f32,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl GeminiGenerator {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-flash-latest";

    /// Default sampling temperature.
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;

    /// Creates a new Gemini client reading the key from the environment.
    #[must_use]
    pub fn new() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY").ok().map(SecretString::from);
        Self {
            api_key,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            temperature: Self::DEFAULT_TEMPERATURE,
            client: build_http_client(ModelHttpConfig::default()),
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Whether a key is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Validates that the client is configured.
    fn validate(&self) -> Result<&SecretString> {
        self.api_key.as_ref().ok_or_else(|| Error::OperationFailed {
            operation: "gemini_generate".to_string(),
            cause: "GEMINI_API_KEY not set".to_string(),
        })
    }

    /// Makes a `generateContent` request.
    fn request(&self, request: &GenerateContentRequest) -> Result<String> {
        let api_key = self.validate()?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint, self.model
        );
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .map_err(|e| Error::OperationFailed {
                operation: "gemini_generate".to_string(),
                cause: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::OperationFailed {
                operation: "gemini_generate".to_string(),
                cause: format!("API returned status: {status} - {body}"),
            });
        }

        let response: GenerateContentResponse =
            response.json().map_err(|e| Error::OperationFailed {
                operation: "gemini_response".to_string(),
                cause: e.to_string(),
            })?;

        // Candidates carry one or more parts; concatenate their text.
        let text = response
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::OperationFailed {
                operation: "gemini_response".to_string(),
                cause: "no candidates in response".to_string(),
            });
        }

        Ok(text)
    }
}

impl Default for GeminiGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for GeminiGenerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn generate(&self, system: &str, user: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: user.to_string(),
                }],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: system.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        self.request(&request)
    }
}

/// Request to the `generateContent` API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

/// A content block in the conversation.
#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

/// A text part.
#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

/// Sampling configuration.
#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Response from the `generateContent` API.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// One generated candidate.
#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
