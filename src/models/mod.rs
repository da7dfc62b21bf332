//! Domain models.
//!
//! Types shared across ingestion, indexing, and the answer pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Placeholder for a missing tool name.
pub const PLACEHOLDER_NAME: &str = "N/A";

/// Placeholder for a missing description.
pub const PLACEHOLDER_DESCRIPTION: &str = "No detailed description available.";

/// Placeholder for a missing install command.
pub const PLACEHOLDER_INSTALL: &str =
    "Installation command not found (check the distribution packages).";

/// Placeholder emitted by the scraper when a command had no example.
pub const PLACEHOLDER_USAGE: &str = "No specific usage example provided.";

/// One sub-command entry of a tool record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    /// Display label of the sub-command (e.g. `nmap -sV`).
    #[serde(default)]
    pub sub_command: String,
    /// Shell usage example, possibly a scraper placeholder.
    #[serde(default)]
    pub usage_example: String,
}

/// One entry of the scraped knowledge base.
///
/// Created once per ingestion run; immutable afterwards. Sparse fields
/// are filled with placeholders, never dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Tool identifier (e.g. `nmap`).
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Install instructions.
    pub install_command: String,
    /// Ordered sub-commands with usage examples.
    pub commands: Vec<ToolCommand>,
    /// Tool category.
    pub category: String,
    /// Source URL of the scraped page.
    pub url: String,
}

/// Provenance metadata carried alongside an indexed document.
///
/// Not used in similarity scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMetadata {
    /// Tool name.
    pub tool: String,
    /// Tool category.
    pub category: String,
    /// Source URL.
    pub url: String,
}

/// The unit stored in the vector collection.
///
/// One per `ToolRecord`; the mapping is total and stable for a given
/// knowledge-base snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Stable identifier: hex SHA-256 of `content`.
    pub id: String,
    /// Flattened text block used as the embedding input.
    pub content: String,
    /// Provenance metadata.
    pub metadata: DocMetadata,
}

impl IndexedDocument {
    /// Creates a document with its identifier derived from the content.
    #[must_use]
    pub fn new(content: String, metadata: DocMetadata) -> Self {
        let id = content_id(&content);
        Self {
            id,
            content,
            metadata,
        }
    }
}

/// Derives the stable hex identifier for a document content block.
#[must_use]
pub fn content_id(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Lifecycle state of a lazily initialized component.
///
/// Replaces ad hoc "is the inner handle `None`" checks with a single
/// typed accessor.
#[derive(Debug)]
pub enum ComponentState<T> {
    /// Initialization has not been attempted yet.
    Uninitialized,
    /// The component is ready for use.
    Ready(T),
    /// Initialization failed; the component stays disabled.
    Unavailable {
        /// Why the component is unavailable.
        reason: String,
    },
}

impl<T> ComponentState<T> {
    /// Returns the inner value if the component is ready.
    ///
    /// # Errors
    ///
    /// Returns `Error::OperationFailed` naming the component when it is
    /// uninitialized or unavailable.
    pub fn ready(&self, component: &str) -> Result<&T> {
        match self {
            Self::Ready(inner) => Ok(inner),
            Self::Uninitialized => Err(Error::OperationFailed {
                operation: component.to_string(),
                cause: "not initialized".to_string(),
            }),
            Self::Unavailable { reason } => Err(Error::OperationFailed {
                operation: component.to_string(),
                cause: reason.clone(),
            }),
        }
    }

    /// Whether the component is ready.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Wraps a fallible initializer, recording the failure reason.
    pub fn from_init(result: Result<T>) -> Self {
        match result {
            Ok(inner) => Self::Ready(inner),
            Err(e) => Self::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_content_id_is_deterministic() {
        let a = content_id("Tool Name: nmap");
        let b = content_id("Tool Name: nmap");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_content_id_differs_for_different_content() {
        assert_ne!(content_id("nmap"), content_id("masscan"));
    }

    #[test]
    fn test_indexed_document_id_matches_content() {
        let doc = IndexedDocument::new(
            "Tool Name: nmap".to_string(),
            DocMetadata {
                tool: "nmap".to_string(),
                category: "Information Gathering".to_string(),
                url: String::new(),
            },
        );
        assert_eq!(doc.id, content_id(&doc.content));
    }

    #[test]
    fn test_component_state_ready_accessor() {
        let state = ComponentState::Ready(42);
        assert!(state.is_ready());
        assert_eq!(state.ready("index").ok(), Some(&42));
    }

    #[test]
    fn test_component_state_unavailable_accessor() {
        let state: ComponentState<u32> = ComponentState::Unavailable {
            reason: "embedding endpoint unreachable".to_string(),
        };
        let err = state.ready("index").map(|_| ()).unwrap_err();
        assert!(err.to_string().contains("embedding endpoint unreachable"));
    }

    #[test]
    fn test_component_state_uninitialized_accessor() {
        let state: ComponentState<u32> = ComponentState::Uninitialized;
        assert!(state.ready("index").is_err());
        assert!(!state.is_ready());
    }

    #[test]
    fn test_component_state_from_init() {
        let ready = ComponentState::from_init(Ok(7));
        assert!(ready.is_ready());

        let failed: ComponentState<u32> =
            ComponentState::from_init(Err(crate::Error::IndexUnavailable("down".to_string())));
        assert!(!failed.is_ready());
    }
}
