//! Two-phase answer pipeline.
//!
//! Phase 1 retrieves documents and asks the generator to answer strictly
//! from them, or to emit the no-context sentinel. Phase 2 runs only on
//! that sentinel and answers from general knowledge, with a disclaimer
//! appended. Phases never run concurrently or speculatively; retrieval
//! strictly precedes phase-1 generation.
//!
//! Every outcome — answer, fallback, or failure — leaves through the
//! sanitizer. Raw provider errors never reach the chat surface.

mod prompts;

pub use prompts::{
    FEATURE_UNAVAILABLE_MESSAGE, KNOWLEDGE_DISCLAIMER, NO_CONTEXT_SENTINEL, grounded_system_prompt,
    grounded_user_prompt, open_system_prompt, open_user_prompt,
};

use std::sync::Arc;

use crate::index::KnowledgeIndex;
use crate::llm::Generator;
use crate::models::ComponentState;
use crate::sanitize::clean_html;
use crate::{Error, Result, truncate_diagnostic};

/// Characters of the underlying error surfaced to users.
const DIAGNOSTIC_MAX_CHARS: usize = 150;

/// Separator between retrieved documents in the context block.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// The two-phase question answering state machine.
pub struct AnswerPipeline {
    index: ComponentState<KnowledgeIndex>,
    generator: ComponentState<Arc<dyn Generator>>,
}

impl AnswerPipeline {
    /// Creates a pipeline over the given component states.
    #[must_use]
    pub const fn new(
        index: ComponentState<KnowledgeIndex>,
        generator: ComponentState<Arc<dyn Generator>>,
    ) -> Self {
        Self { index, generator }
    }

    /// Whether both the index and the generator are ready.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.index.is_ready() && self.generator.is_ready()
    }

    /// Number of indexed documents, when the index is ready.
    #[must_use]
    pub fn indexed_documents(&self) -> Option<usize> {
        match &self.index {
            ComponentState::Ready(index) => Some(index.count()),
            _ => None,
        }
    }

    /// Answers a question; the result is always sanitized, user-safe text.
    ///
    /// Failures are converted at this boundary into fixed messages with
    /// truncated diagnostics. The call never panics and never surfaces a
    /// raw error.
    #[must_use]
    pub fn answer(&self, query: &str) -> String {
        match self.try_answer(query) {
            Ok(text) => clean_html(&text),
            Err(e) => {
                tracing::error!("Answer pipeline failed: {e}");
                metrics::counter!("rag_requests_total", "outcome" => "error").increment(1);
                clean_html(&Self::user_message_for(&e))
            },
        }
    }

    /// Runs the state machine, returning unsanitized text or a typed error.
    ///
    /// # Errors
    ///
    /// - `Error::IndexUnavailable` when the index never initialized.
    /// - `Error::GenerationFailure` when either generation phase fails.
    pub fn try_answer(&self, query: &str) -> Result<String> {
        // PHASE1_RETRIEVE
        let index = self
            .index
            .ready("answer_pipeline")
            .map_err(|_| Error::IndexUnavailable("phase 1 not initialized".to_string()))?;
        let generator = self.generator.ready("answer_pipeline").map_err(|_| {
            Error::GenerationFailure {
                phase: "phase 1".to_string(),
                cause: "phase 1 not initialized".to_string(),
            }
        })?;

        let retrieved = index.search(query).map_err(|e| Error::GenerationFailure {
            phase: "phase 1".to_string(),
            cause: e.to_string(),
        })?;
        let context = retrieved
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        tracing::debug!(retrieved = retrieved.len(), "Phase 1 context assembled");

        // PHASE1_GENERATE
        let phase1 = generator
            .generate(
                &grounded_system_prompt(),
                &grounded_user_prompt(&context, query),
            )
            .map_err(|e| Error::GenerationFailure {
                phase: "phase 1".to_string(),
                cause: e.to_string(),
            })?;

        // The sentinel decision is an exact comparison after trimming.
        if phase1.trim() != NO_CONTEXT_SENTINEL {
            metrics::counter!("rag_requests_total", "outcome" => "grounded").increment(1);
            return Ok(phase1);
        }

        tracing::info!("Phase 1 reported no usable context, falling back to general knowledge");

        // PHASE2_GENERATE
        let generator = self.generator.ready("answer_pipeline").map_err(|_| {
            Error::GenerationFailure {
                phase: "phase 2".to_string(),
                cause: "phase 2 not initialized".to_string(),
            }
        })?;
        let phase2 = generator
            .generate(&open_system_prompt(), &open_user_prompt(query))
            .map_err(|e| Error::GenerationFailure {
                phase: "phase 2".to_string(),
                cause: e.to_string(),
            })?;

        metrics::counter!("rag_requests_total", "outcome" => "fallback").increment(1);
        Ok(format!("{phase2}\n\n{KNOWLEDGE_DISCLAIMER}"))
    }

    /// Maps a pipeline error to its fixed user-visible message.
    fn user_message_for(err: &Error) -> String {
        match err {
            Error::IndexUnavailable(_) => FEATURE_UNAVAILABLE_MESSAGE.to_string(),
            Error::GenerationFailure { cause, .. } => format!(
                "An error occurred while looking up suggestions. Please try again later. \
Error: {}",
                truncate_diagnostic(cause, DIAGNOSTIC_MAX_CHARS)
            ),
            _ => "An unexpected error occurred while processing your request. Please try again."
                .to_string(),
        }
    }
}
