//! Gemini `embedContent` client.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::llm::{ModelHttpConfig, RetryPolicy, build_http_client, execute_with_retry};
use crate::{Error, Result};

/// Batch size for `batchEmbedContents` requests.
const EMBED_BATCH_SIZE: usize = 64;

/// Gemini embedding client.
pub struct GeminiEmbedder {
    /// API key.
    api_key: Option<SecretString>,
    /// API endpoint.
    endpoint: String,
    /// Embedding model.
    model: String,
    /// Retry policy for transient failures.
    policy: RetryPolicy,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl GeminiEmbedder {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default embedding model.
    pub const DEFAULT_MODEL: &'static str = "embedding-001";

    /// Embedding dimensions of the default model.
    pub const DEFAULT_DIMENSIONS: usize = 768;

    /// Creates a new embedding client reading the key from the environment.
    #[must_use]
    pub fn new() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY").ok().map(SecretString::from);
        Self {
            api_key,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            policy: RetryPolicy::default(),
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

    /// Sets the embedding model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether a key is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn validate(&self) -> Result<&SecretString> {
        self.api_key.as_ref().ok_or_else(|| Error::OperationFailed {
            operation: "gemini_embed".to_string(),
            cause: "GEMINI_API_KEY not set".to_string(),
        })
    }

    fn post<B: Serialize, R: for<'de> Deserialize<'de>>(&self, method: &str, body: &B) -> Result<R> {
        let api_key = self.validate()?;
        let url = format!("{}/models/{}:{}", self.endpoint, self.model, method);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .map_err(|e| Error::OperationFailed {
                operation: "gemini_embed".to_string(),
                cause: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::OperationFailed {
                operation: "gemini_embed".to_string(),
                cause: format!("API returned status: {status} - {body}"),
            });
        }

        response.json().map_err(|e| Error::OperationFailed {
            operation: "gemini_embed_response".to_string(),
            cause: e.to_string(),
        })
    }

    fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: format!("models/{}", self.model),
                    content: EmbedContent {
                        parts: vec![EmbedPart {
                            text: (*text).to_string(),
                        }],
                    },
                })
                .collect(),
        };

        let response: BatchEmbedResponse = execute_with_retry("gemini", "embed_batch", self.policy, || {
            self.post("batchEmbedContents", &request)
        })?;

        if response.embeddings.len() != texts.len() {
            return Err(Error::OperationFailed {
                operation: "gemini_embed_response".to_string(),
                cause: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    response.embeddings.len()
                ),
            });
        }

        Ok(response
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }
}

impl Default for GeminiEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        Self::DEFAULT_DIMENSIONS
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: format!("models/{}", self.model),
            content: EmbedContent {
                parts: vec![EmbedPart {
                    text: text.to_string(),
                }],
            },
        };

        let response: EmbedResponse = execute_with_retry("gemini", "embed", self.policy, || {
            self.post("embedContent", &request)
        })?;

        Ok(response.embedding.values)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH_SIZE) {
            vectors.extend(self.embed_chunk(chunk)?);
        }
        Ok(vectors)
    }
}

/// Request to the `embedContent` API.
#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
}

/// Content wrapper for embedding input.
#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<EmbedPart>,
}

/// A text part of embedding input.
#[derive(Debug, Serialize)]
struct EmbedPart {
    text: String,
}

/// Request to the `batchEmbedContents` API.
#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

/// Response from the `embedContent` API.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

/// Response from the `batchEmbedContents` API.
#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

/// One embedding vector.
#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GeminiEmbedder::new();
        assert_eq!(client.model, GeminiEmbedder::DEFAULT_MODEL);
        assert_eq!(client.dimensions(), GeminiEmbedder::DEFAULT_DIMENSIONS);
    }

    #[test]
    fn test_client_configuration() {
        let client = GeminiEmbedder::new()
            .with_api_key(SecretString::from("test-key"))
            .with_endpoint("https://custom.endpoint")
            .with_model("embedding-002")
            .with_retry_policy(RetryPolicy::none());

        assert!(client.is_configured());
        assert_eq!(client.endpoint, "https://custom.endpoint");
        assert_eq!(client.model, "embedding-002");
    }

    #[test]
    fn test_validate_no_key() {
        let client = GeminiEmbedder {
            api_key: None,
            endpoint: GeminiEmbedder::DEFAULT_ENDPOINT.to_string(),
            model: GeminiEmbedder::DEFAULT_MODEL.to_string(),
            policy: RetryPolicy::none(),
            client: reqwest::blocking::Client::new(),
        };

        assert!(client.validate().is_err());
    }

    #[test]
    fn test_batch_response_deserialization() {
        let json = r#"{"embeddings": [{"values": [0.1, 0.2]}, {"values": [0.3, 0.4]}]}"#;
        let response: BatchEmbedResponse =
            serde_json::from_str(json).unwrap_or(BatchEmbedResponse {
                embeddings: Vec::new(),
            });
        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(response.embeddings[0].values, vec![0.1, 0.2]);
    }
}
