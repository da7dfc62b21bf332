//! Knowledge-base ingestion.
//!
//! Loads the scraped tool-documentation JSON file and flattens each record
//! into the text block that becomes the embedding input. Pure transform,
//! no side effects beyond logging counts.

use std::path::Path;

use serde_json::Value;

use crate::models::{
    DocMetadata, IndexedDocument, PLACEHOLDER_DESCRIPTION, PLACEHOLDER_INSTALL, PLACEHOLDER_NAME,
    PLACEHOLDER_USAGE, ToolCommand, ToolRecord,
};
use crate::{Error, Result};

/// Loads tool records from a knowledge-base JSON file.
///
/// The file is a JSON array of objects with optional `name`,
/// `main_description`, `how_to_install`, `url`, `category`, and
/// `commands` fields. Sparse fields are defaulted; a record is never
/// dropped for missing fields.
///
/// # Errors
///
/// Returns `Error::DataUnavailable` when the file is missing or is not
/// valid JSON. Callers treat this as "no knowledge base".
pub fn load_tool_records(path: &Path) -> Result<Vec<ToolRecord>> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::DataUnavailable {
        path: path.display().to_string(),
        cause: e.to_string(),
    })?;

    let parsed: Value = serde_json::from_str(&raw).map_err(|e| Error::DataUnavailable {
        path: path.display().to_string(),
        cause: format!("invalid JSON: {e}"),
    })?;

    let Value::Array(items) = parsed else {
        return Err(Error::DataUnavailable {
            path: path.display().to_string(),
            cause: "expected a JSON array of tool records".to_string(),
        });
    };

    let mut records = Vec::with_capacity(items.len());
    for item in &items {
        if let Some(record) = record_from_value(item) {
            records.push(record);
        } else {
            tracing::warn!("Skipping non-object knowledge base entry");
        }
    }

    tracing::info!(
        count = records.len(),
        path = %path.display(),
        "Loaded tool records"
    );
    Ok(records)
}

/// Extracts a tool record from one JSON array element.
///
/// Returns `None` only for elements that are not objects; sparse objects
/// ingest with placeholder values.
fn record_from_value(value: &Value) -> Option<ToolRecord> {
    let obj = value.as_object()?;

    let str_field = |key: &str, default: &str| -> String {
        obj.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(default)
            .to_string()
    };

    let commands = obj
        .get("commands")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_object)
                .map(|cmd| ToolCommand {
                    sub_command: cmd
                        .get("sub_command")
                        .and_then(Value::as_str)
                        .unwrap_or(PLACEHOLDER_NAME)
                        .to_string(),
                    usage_example: cmd
                        .get("usage_example")
                        .and_then(Value::as_str)
                        .unwrap_or(PLACEHOLDER_USAGE)
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(ToolRecord {
        name: str_field("name", PLACEHOLDER_NAME),
        description: str_field("main_description", PLACEHOLDER_DESCRIPTION),
        install_command: str_field("how_to_install", PLACEHOLDER_INSTALL),
        commands,
        category: str_field("category", "Unknown"),
        url: str_field("url", ""),
    })
}

/// Flattens tool records into indexed documents.
///
/// One document per record; the mapping is total and stable for a given
/// knowledge-base snapshot.
#[must_use]
pub fn build_documents(records: &[ToolRecord]) -> Vec<IndexedDocument> {
    let documents: Vec<IndexedDocument> = records
        .iter()
        .map(|record| {
            IndexedDocument::new(
                build_content(record),
                DocMetadata {
                    tool: record.name.clone(),
                    category: record.category.clone(),
                    url: record.url.clone(),
                },
            )
        })
        .collect();

    tracing::info!(count = documents.len(), "Prepared documents for indexing");
    documents
}

/// Synthesizes the flat content block for one record.
///
/// Layout: name line, description line, install line, and one line per
/// sub-command. Commands without a real usage example get a synthesized
/// "see --help/man" fallback.
fn build_content(record: &ToolRecord) -> String {
    let mut parts = vec![
        format!("Tool Name: {}", record.name),
        format!("Description: {}", record.description),
        format!("How to Install: {}", record.install_command),
    ];

    if !record.commands.is_empty() {
        let mut block = String::from("Commands and Usage Examples:\n");
        for cmd in &record.commands {
            let usage = cmd.usage_example.trim();
            if usage.is_empty() || usage == PLACEHOLDER_USAGE {
                block.push_str(&format!(
                    "- {0}: Run `{0} --help` or `man {0}` for usage.\n",
                    cmd.sub_command
                ));
            } else {
                block.push_str(&format!("- {}: {}\n", cmd.sub_command, usage));
            }
        }
        parts.push(block);
    }

    parts.join("\n\n").trim().to_string()
}
