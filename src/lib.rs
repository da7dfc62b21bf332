//! # Toolscout
//!
//! Telegram assistant bot for pentesting tool guidance.
//!
//! Toolscout answers questions about security tooling with a two-phase
//! retrieval-augmented pipeline over a scraped knowledge base, and offers
//! an LLM-backed translation command alongside the usual canned greetings.
//!
//! ## Features
//!
//! - Document ingestion from a scraped tool-documentation JSON file
//! - Persisted vector collection with self-healing startup reconciliation
//! - Two-phase answering: grounded-in-context first, general knowledge
//!   fallback on an explicit no-context sentinel
//! - HTML output sanitization against Telegram's allowed tag vocabulary
//! - Long-poll Telegram gateway with graceful render degradation
//!
//! ## Example
//!
//! ```rust,ignore
//! use toolscout::pipeline::AnswerPipeline;
//!
//! let pipeline = AnswerPipeline::new(index, generator, prompts);
//! let reply = pipeline.answer("how do I scan ports on a host?");
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod embedding;
pub mod gateway;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod sanitize;
pub mod translate;

// Re-exports for convenience
pub use config::ToolscoutConfig;
pub use embedding::Embedder;
pub use index::KnowledgeIndex;
pub use ingest::{build_documents, load_tool_records};
pub use llm::Generator;
pub use models::{ComponentState, DocMetadata, IndexedDocument, ToolCommand, ToolRecord};
pub use pipeline::AnswerPipeline;
pub use sanitize::clean_html;
pub use translate::TranslationService;

/// Error type for toolscout operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `DataUnavailable` | Knowledge-base file missing or corrupt at ingestion time |
/// | `IndexUnavailable` | Vector collection cannot be built or loaded, embedding capability unreachable |
/// | `GenerationFailure` | Chat-completion call fails (network, rate limit, malformed response) |
/// | `RenderRejected` | The chat surface rejected an already-sanitized message |
/// | `InvalidInput` | Missing command arguments, malformed configuration values |
/// | `OperationFailed` | Filesystem I/O errors, HTTP transport faults outside the model calls |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Knowledge-base data could not be loaded.
    ///
    /// Recovered locally: the caller treats this as "no knowledge base"
    /// and the RAG feature reports itself unavailable.
    #[error("knowledge base unavailable at '{path}': {cause}")]
    DataUnavailable {
        /// Path that failed to load.
        path: String,
        /// The underlying cause.
        cause: String,
    },

    /// The vector index could not be built or loaded.
    ///
    /// Raised when:
    /// - The embedding capability is unreachable at build time
    /// - Persistent storage stays unusable even after a rebuild attempt
    #[error("knowledge index unavailable: {0}")]
    IndexUnavailable(String),

    /// An external generation call failed.
    ///
    /// Carries the phase that was executing so the pipeline can produce
    /// a phase-specific user-safe message.
    #[error("generation failed during {phase}: {cause}")]
    GenerationFailure {
        /// Pipeline phase that was executing ("phase 1", "phase 2", "translate").
        phase: String,
        /// The underlying cause.
        cause: String,
    },

    /// The rendering surface rejected the sanitized output.
    ///
    /// Should be rare given sanitization, but handled with a
    /// strip-markup-then-apologize degrade ladder in the gateway.
    #[error("render rejected by chat surface: {0}")]
    RenderRejected(String),

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A command is invoked without its required argument
    /// - Configuration values fail to parse
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem I/O errors occur on the collection directory
    /// - The Telegram transport fails outside of message rendering
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for toolscout operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Truncates an error diagnostic for user-visible messages.
///
/// Raw provider errors can carry request bodies and stack-trace-like
/// payloads; only the leading fragment ever crosses into chat output.
#[must_use]
pub fn truncate_diagnostic(detail: &str, max_chars: usize) -> String {
    if detail.chars().count() <= max_chars {
        return detail.to_string();
    }
    let truncated: String = detail.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DataUnavailable {
            path: "data/tools.json".to_string(),
            cause: "no such file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "knowledge base unavailable at 'data/tools.json': no such file"
        );

        let err = Error::IndexUnavailable("embedding endpoint unreachable".to_string());
        assert!(err.to_string().contains("knowledge index unavailable"));

        let err = Error::GenerationFailure {
            phase: "phase 2".to_string(),
            cause: "rate limited".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "generation failed during phase 2: rate limited"
        );

        let err = Error::RenderRejected("can't parse entities".to_string());
        assert!(err.to_string().contains("render rejected"));
    }

    #[test]
    fn test_truncate_diagnostic_short_input() {
        assert_eq!(truncate_diagnostic("boom", 150), "boom");
    }

    #[test]
    fn test_truncate_diagnostic_long_input() {
        let long = "x".repeat(500);
        let truncated = truncate_diagnostic(&long, 150);
        assert_eq!(truncated.chars().count(), 153);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_diagnostic_multibyte_boundary() {
        let detail = "lỗi ".repeat(100);
        let truncated = truncate_diagnostic(&detail, 150);
        assert!(truncated.chars().count() <= 153);
    }
}
