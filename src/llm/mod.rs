//! Chat-completion client abstraction.
//!
//! Provides a unified interface over the external generation capability.

mod gemini;
mod resilience;

pub use gemini::GeminiGenerator;
pub use resilience::{ResilientGenerator, RetryPolicy, execute_with_retry};

use crate::Result;
use std::time::Duration;

/// Trait for text generation providers.
pub trait Generator: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Generates a completion for a system instruction and user message.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn generate(&self, system: &str, user: &str) -> Result<String>;
}

/// HTTP client configuration for model providers.
#[derive(Debug, Clone, Copy)]
pub struct ModelHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for ModelHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// Builds a blocking HTTP client for model requests with configured timeouts.
#[must_use]
pub fn build_http_client(config: ModelHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build model HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Extracts JSON from a model response, handling markdown code blocks.
///
/// Models asked for JSON frequently wrap it in fences or prefix prose;
/// callers parse the extracted slice and decide their own fallback.
#[must_use]
pub fn extract_json_from_response(response: &str) -> &str {
    let trimmed = response.trim();

    // Handle ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // Handle ``` ... ``` blocks (without json marker)
    if let Some(start) = trimmed.find("```") {
        let content_start = start + 3;
        let after_marker = &trimmed[content_start..];
        let json_start = after_marker
            .find('{')
            .map_or(content_start, |pos| content_start + pos);
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // Handle raw JSON (find first { to last })
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            return &trimmed[start..=end];
        }
    }

    trimmed
}
