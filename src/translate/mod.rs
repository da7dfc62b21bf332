//! Translation service.
//!
//! Vietnamese/English interpretation over the shared generation
//! capability: Vietnamese input is translated to English, English input
//! is grammar-corrected, mixed input is unified into English. Quoted
//! parameters are kept verbatim.

use std::sync::Arc;

use serde::Deserialize;

use crate::llm::{Generator, extract_json_from_response};
use crate::models::ComponentState;
use crate::{Error, Result, truncate_diagnostic};

/// Characters of the underlying error surfaced to users.
const DIAGNOSTIC_MAX_CHARS: usize = 150;

/// Returned when the service never initialized.
pub const TRANSLATION_UNAVAILABLE_MESSAGE: &str =
    "The translation feature is currently unavailable. Please check the bot configuration.";

/// System instruction for the interpreter role.
const TRANSLATE_SYSTEM_PROMPT: &str = "\
You are an English language expert acting as an interpreter. Rules:\n\
1. Fix the grammar; translate Vietnamese input into English; make English \
input grammatically correct.\n\
2. Keep the sentence easy to understand.\n\
3. If the input mixes English and Vietnamese, convert everything to English \
and apply the rules above.\n\
4. Keep parameters and quoted fragments exactly as written.\n\
5. Respond with JSON only: {\"input\": \"<original>\", \"output\": \"<translation>\"} \
with no explanation outside the JSON.";

/// Expected response contract.
#[derive(Debug, Deserialize)]
struct TranslationResponse {
    #[allow(dead_code)]
    input: Option<String>,
    output: String,
}

/// LLM-backed translation service.
pub struct TranslationService {
    generator: ComponentState<Arc<dyn Generator>>,
}

impl TranslationService {
    /// Creates the service over a generator state.
    #[must_use]
    pub const fn new(generator: ComponentState<Arc<dyn Generator>>) -> Self {
        Self { generator }
    }

    /// Whether the service can translate.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.generator.is_ready()
    }

    /// Translates text; the result is always user-safe plain text.
    #[must_use]
    pub fn translate(&self, text: &str) -> String {
        match self.try_translate(text) {
            Ok(translated) => translated,
            Err(e) => {
                tracing::error!("Translation failed: {e}");
                match e {
                    Error::GenerationFailure { cause, .. } => format!(
                        "An error occurred while translating. Error: {}",
                        truncate_diagnostic(&cause, DIAGNOSTIC_MAX_CHARS)
                    ),
                    _ => TRANSLATION_UNAVAILABLE_MESSAGE.to_string(),
                }
            },
        }
    }

    /// Runs the translation call and parses the JSON contract.
    ///
    /// # Errors
    ///
    /// Returns `Error::GenerationFailure` when the model call fails, or
    /// `Error::OperationFailed` when the service is not initialized.
    pub fn try_translate(&self, text: &str) -> Result<String> {
        let generator = self.generator.ready("translation_service")?;

        let raw = generator
            .generate(
                TRANSLATE_SYSTEM_PROMPT,
                &format!("Text to interpret: {text}"),
            )
            .map_err(|e| Error::GenerationFailure {
                phase: "translate".to_string(),
                cause: e.to_string(),
            })?;

        // Models occasionally ignore the JSON contract; fall back to the
        // raw trimmed text rather than failing the request.
        let extracted = extract_json_from_response(&raw);
        match serde_json::from_str::<TranslationResponse>(extracted) {
            Ok(parsed) => Ok(parsed.output),
            Err(_) => {
                tracing::warn!("Translation response violated the JSON contract");
                Ok(raw.trim().to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;

    struct FixedGenerator(&'static str);

    impl Generator for FixedGenerator {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn generate(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    impl Generator for FailingGenerator {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn generate(&self, _system: &str, _user: &str) -> Result<String> {
            Err(Error::OperationFailed {
                operation: "generate".to_string(),
                cause: "socket hang up mid-request with a very long diagnostic payload \
attached that nobody should ever see in full inside a chat message because it is \
noisy and may leak internals"
                    .to_string(),
            })
        }
    }

    fn service(generator: impl Generator + 'static) -> TranslationService {
        TranslationService::new(ComponentState::Ready(
            Arc::new(generator) as Arc<dyn Generator>
        ))
    }

    #[test]
    fn test_parses_json_contract() {
        let svc = service(FixedGenerator(
            r#"{"input": "xin chào", "output": "hello"}"#,
        ));
        assert_eq!(svc.translate("xin chào"), "hello");
    }

    #[test]
    fn test_parses_fenced_json() {
        let svc = service(FixedGenerator(
            "```json\n{\"input\": \"a\", \"output\": \"b\"}\n```",
        ));
        assert_eq!(svc.translate("a"), "b");
    }

    #[test]
    fn test_contract_violation_falls_back_to_raw_text() {
        let svc = service(FixedGenerator("  hello world  "));
        assert_eq!(svc.translate("xin chào"), "hello world");
    }

    #[test]
    fn test_failure_yields_truncated_diagnostic() {
        let svc = service(FailingGenerator);
        let reply = svc.translate("anything");
        assert!(reply.starts_with("An error occurred while translating."));
        assert!(!reply.contains("may leak internals"));
    }

    #[test]
    fn test_unavailable_service_reports_fixed_message() {
        let svc = TranslationService::new(ComponentState::<Arc<dyn Generator>>::Unavailable {
            reason: "GEMINI_API_KEY not set".to_string(),
        });
        assert!(!svc.is_available());
        assert_eq!(svc.translate("hello"), TRANSLATION_UNAVAILABLE_MESSAGE);
    }
}
