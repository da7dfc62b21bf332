//! Directory-persisted vector collection.
//!
//! A collection lives under `<base>/<name>/` as two JSON files: a
//! manifest (dimensions, count, creation time) and the ordered document
//! list with embeddings. Insertion order is preserved and is the tie
//! break for equal similarity scores.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::IndexedDocument;
use crate::{Error, Result};

/// Manifest file name inside a collection directory.
const MANIFEST_FILE: &str = "manifest.json";

/// Document file name inside a collection directory.
const DOCUMENTS_FILE: &str = "documents.json";

/// A document plus its embedding, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    /// The indexed document.
    pub document: IndexedDocument,
    /// Embedding computed at index-build time.
    pub embedding: Vec<f32>,
}

/// Collection metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    collection: String,
    dimensions: usize,
    count: usize,
    created_at: DateTime<Utc>,
}

/// A named, directory-persisted vector collection.
#[derive(Debug)]
pub struct DiskVectorStore {
    collection_dir: PathBuf,
    manifest: Manifest,
    documents: Vec<StoredDocument>,
}

impl DiskVectorStore {
    /// Whether a collection exists under the base directory.
    #[must_use]
    pub fn exists(base_dir: &Path, collection: &str) -> bool {
        base_dir.join(collection).join(MANIFEST_FILE).exists()
    }

    /// Opens an existing collection.
    ///
    /// # Errors
    ///
    /// Returns `Error::OperationFailed` when the manifest or document
    /// file is missing, unreadable, or inconsistent.
    pub fn open(base_dir: &Path, collection: &str) -> Result<Self> {
        let collection_dir = base_dir.join(collection);
        let manifest: Manifest = read_json(&collection_dir.join(MANIFEST_FILE))?;
        let documents: Vec<StoredDocument> = read_json(&collection_dir.join(DOCUMENTS_FILE))?;

        if manifest.count != documents.len() {
            return Err(Error::OperationFailed {
                operation: "open_collection".to_string(),
                cause: format!(
                    "manifest count {} does not match {} stored documents",
                    manifest.count,
                    documents.len()
                ),
            });
        }

        Ok(Self {
            collection_dir,
            manifest,
            documents,
        })
    }

    /// Creates a new, empty collection, persisting it immediately.
    ///
    /// # Errors
    ///
    /// Returns `Error::OperationFailed` on filesystem failures.
    pub fn create(base_dir: &Path, collection: &str, dimensions: usize) -> Result<Self> {
        let collection_dir = base_dir.join(collection);
        fs::create_dir_all(&collection_dir).map_err(|e| Error::OperationFailed {
            operation: "create_collection".to_string(),
            cause: format!("{}: {e}", collection_dir.display()),
        })?;

        let store = Self {
            collection_dir,
            manifest: Manifest {
                collection: collection.to_string(),
                dimensions,
                count: 0,
                created_at: Utc::now(),
            },
            documents: Vec::new(),
        };
        store.persist()?;
        Ok(store)
    }

    /// Removes a collection directory if present.
    ///
    /// # Errors
    ///
    /// Returns `Error::OperationFailed` when removal fails.
    pub fn delete(base_dir: &Path, collection: &str) -> Result<()> {
        let collection_dir = base_dir.join(collection);
        if !collection_dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&collection_dir).map_err(|e| Error::OperationFailed {
            operation: "delete_collection".to_string(),
            cause: format!("{}: {e}", collection_dir.display()),
        })
    }

    /// Number of stored documents.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.documents.len()
    }

    /// Embedding dimensions of the collection (0 until first insert).
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.manifest.dimensions
    }

    /// Inserts documents in order and persists the collection.
    ///
    /// # Errors
    ///
    /// Returns `Error::OperationFailed` on a dimension mismatch or a
    /// filesystem failure.
    pub fn bulk_insert(&mut self, batch: Vec<StoredDocument>) -> Result<()> {
        for stored in &batch {
            if self.manifest.dimensions == 0 {
                self.manifest.dimensions = stored.embedding.len();
            } else if stored.embedding.len() != self.manifest.dimensions {
                return Err(Error::OperationFailed {
                    operation: "bulk_insert".to_string(),
                    cause: format!(
                        "embedding has {} dimensions, collection expects {}",
                        stored.embedding.len(),
                        self.manifest.dimensions
                    ),
                });
            }
        }

        self.documents.extend(batch);
        self.manifest.count = self.documents.len();
        self.persist()
    }

    /// Returns the top-`k` documents by cosine similarity.
    ///
    /// Deterministic for a fixed collection: scores tie-break by
    /// insertion order (stable sort).
    #[must_use]
    pub fn query(&self, vector: &[f32], k: usize) -> Vec<&StoredDocument> {
        let mut scored: Vec<(usize, f32)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(i, stored)| (i, cosine_similarity(vector, &stored.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(i, _)| &self.documents[i])
            .collect()
    }

    /// Writes the manifest and document files.
    fn persist(&self) -> Result<()> {
        write_json(&self.collection_dir.join(MANIFEST_FILE), &self.manifest)?;
        write_json(&self.collection_dir.join(DOCUMENTS_FILE), &self.documents)
    }
}

/// Cosine similarity with a zero-norm guard.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        dot / denominator
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|e| Error::OperationFailed {
        operation: "read_collection_file".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    serde_json::from_str(&raw).map_err(|e| Error::OperationFailed {
        operation: "parse_collection_file".to_string(),
        cause: format!("{}: {e}", path.display()),
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).map_err(|e| Error::OperationFailed {
        operation: "serialize_collection_file".to_string(),
        cause: e.to_string(),
    })?;
    fs::write(path, raw).map_err(|e| Error::OperationFailed {
        operation: "write_collection_file".to_string(),
        cause: format!("{}: {e}", path.display()),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::models::DocMetadata;

    fn stored(tool: &str, embedding: Vec<f32>) -> StoredDocument {
        StoredDocument {
            document: IndexedDocument::new(
                format!("Tool Name: {tool}"),
                DocMetadata {
                    tool: tool.to_string(),
                    category: "Unknown".to_string(),
                    url: String::new(),
                },
            ),
            embedding,
        }
    }

    #[test]
    fn test_create_open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DiskVectorStore::create(dir.path(), "tool_docs", 0).expect("create");
        store
            .bulk_insert(vec![stored("nmap", vec![1.0, 0.0])])
            .expect("insert");

        assert!(DiskVectorStore::exists(dir.path(), "tool_docs"));
        let reopened = DiskVectorStore::open(dir.path(), "tool_docs").expect("open");
        assert_eq!(reopened.count(), 1);
        assert_eq!(reopened.dimensions(), 2);
    }

    #[test]
    fn test_open_missing_collection_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DiskVectorStore::open(dir.path(), "tool_docs").is_err());
    }

    #[test]
    fn test_open_corrupt_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let collection_dir = dir.path().join("tool_docs");
        fs::create_dir_all(&collection_dir).expect("mkdir");
        fs::write(collection_dir.join(MANIFEST_FILE), "{ nope").expect("write");
        assert!(DiskVectorStore::open(dir.path(), "tool_docs").is_err());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DiskVectorStore::create(dir.path(), "tool_docs", 0).expect("create");
        store
            .bulk_insert(vec![stored("nmap", vec![1.0, 0.0])])
            .expect("insert");
        let err = store.bulk_insert(vec![stored("john", vec![1.0, 0.0, 0.0])]);
        assert!(err.is_err());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        DiskVectorStore::create(dir.path(), "tool_docs", 0).expect("create");
        DiskVectorStore::delete(dir.path(), "tool_docs").expect("first delete");
        DiskVectorStore::delete(dir.path(), "tool_docs").expect("second delete");
        assert!(!DiskVectorStore::exists(dir.path(), "tool_docs"));
    }

    #[test]
    fn test_query_orders_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DiskVectorStore::create(dir.path(), "tool_docs", 0).expect("create");
        store
            .bulk_insert(vec![
                stored("orthogonal", vec![0.0, 1.0]),
                stored("aligned", vec![1.0, 0.0]),
                stored("diagonal", vec![1.0, 1.0]),
            ])
            .expect("insert");

        let hits = store.query(&[1.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.metadata.tool, "aligned");
        assert_eq!(hits[1].document.metadata.tool, "diagonal");
    }

    #[test]
    fn test_query_breaks_ties_by_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DiskVectorStore::create(dir.path(), "tool_docs", 0).expect("create");
        store
            .bulk_insert(vec![
                stored("first", vec![1.0, 0.0]),
                stored("second", vec![1.0, 0.0]),
                stored("third", vec![2.0, 0.0]),
            ])
            .expect("insert");

        let hits = store.query(&[1.0, 0.0], 3);
        // All three have identical cosine score; insertion order holds.
        assert_eq!(hits[0].document.metadata.tool, "first");
        assert_eq!(hits[1].document.metadata.tool, "second");
        assert_eq!(hits[2].document.metadata.tool, "third");
    }

    #[test]
    fn test_query_with_k_larger_than_collection() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DiskVectorStore::create(dir.path(), "tool_docs", 0).expect("create");
        store
            .bulk_insert(vec![stored("only", vec![1.0, 0.0])])
            .expect("insert");
        assert_eq!(store.query(&[1.0, 0.0], 10).len(), 1);
    }

    #[test]
    fn test_cosine_similarity_zero_norm_guard() {
        assert!((cosine_similarity(&[0.0, 0.0], &[1.0, 0.0])).abs() < f32::EPSILON);
        assert!((cosine_similarity(&[], &[])).abs() < f32::EPSILON);
    }
}
