//! Knowledge index.
//!
//! Owns the mapping from ingested documents to the persisted vector
//! collection and reconciles the on-disk state at startup: reuse a
//! non-empty collection as-is, repopulate an empty one, rebuild from
//! scratch when the store is missing or unreadable. The index is never
//! left serving zero documents while ingestible data exists.

mod store;

pub use store::{DiskVectorStore, StoredDocument};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::embedding::Embedder;
use crate::models::IndexedDocument;
use crate::{Error, Result};

/// Fixed collection name for the tool documentation index.
pub const COLLECTION_NAME: &str = "tool_docs";

/// Default number of documents retrieved per query.
pub const DEFAULT_TOP_K: usize = 4;

/// Queryable vector index over the tool knowledge base.
pub struct KnowledgeIndex {
    store: DiskVectorStore,
    embedder: Arc<dyn Embedder>,
    base_dir: PathBuf,
    top_k: usize,
}

impl KnowledgeIndex {
    /// Builds or loads the index for a knowledge-base snapshot.
    ///
    /// Policy, in priority order:
    /// 1. Persisted collection exists and is non-empty: reuse, no
    ///    embedding calls.
    /// 2. Collection exists but is empty: embed `documents` and insert
    ///    into it.
    /// 3. Collection absent or unreadable: discard any partial
    ///    directory, embed fresh, create anew.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexUnavailable` when there are no documents to
    /// index and nothing persisted to reuse, or when the embedding
    /// capability fails.
    pub fn build_or_load(
        base_dir: &Path,
        documents: Vec<IndexedDocument>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Result<Self> {
        if DiskVectorStore::exists(base_dir, COLLECTION_NAME) {
            match DiskVectorStore::open(base_dir, COLLECTION_NAME) {
                Ok(store) if store.count() > 0 => {
                    tracing::info!(
                        count = store.count(),
                        collection = COLLECTION_NAME,
                        "Reusing persisted collection"
                    );
                    return Ok(Self {
                        store,
                        embedder,
                        base_dir: base_dir.to_path_buf(),
                        top_k,
                    });
                },
                Ok(store) => {
                    tracing::warn!(
                        collection = COLLECTION_NAME,
                        "Persisted collection is empty, re-populating"
                    );
                    return Self::populate(store, base_dir, documents, embedder, top_k);
                },
                Err(e) => {
                    tracing::warn!(
                        collection = COLLECTION_NAME,
                        "Could not load persisted collection ({e}), rebuilding"
                    );
                    DiskVectorStore::delete(base_dir, COLLECTION_NAME)?;
                },
            }
        }

        tracing::info!(collection = COLLECTION_NAME, "Creating new collection");
        let store = DiskVectorStore::create(base_dir, COLLECTION_NAME, 0)
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
        Self::populate(store, base_dir, documents, embedder, top_k)
    }

    /// Discards the persisted collection and rebuilds it from scratch.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::build_or_load`].
    pub fn rebuild(
        base_dir: &Path,
        documents: Vec<IndexedDocument>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Result<Self> {
        DiskVectorStore::delete(base_dir, COLLECTION_NAME)?;
        Self::build_or_load(base_dir, documents, embedder, top_k)
    }

    /// Embeds documents into an open (empty) store.
    fn populate(
        mut store: DiskVectorStore,
        base_dir: &Path,
        documents: Vec<IndexedDocument>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Result<Self> {
        if documents.is_empty() {
            return Err(Error::IndexUnavailable(
                "knowledge base produced no documents".to_string(),
            ));
        }

        let texts: Vec<&str> = documents.iter().map(|doc| doc.content.as_str()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .map_err(|e| Error::IndexUnavailable(format!("embedding failed: {e}")))?;

        if embeddings.len() != documents.len() {
            return Err(Error::IndexUnavailable(format!(
                "embedded {} of {} documents",
                embeddings.len(),
                documents.len()
            )));
        }

        let batch: Vec<StoredDocument> = documents
            .into_iter()
            .zip(embeddings)
            .map(|(document, embedding)| StoredDocument {
                document,
                embedding,
            })
            .collect();

        let inserted = batch.len();
        store
            .bulk_insert(batch)
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;

        tracing::info!(
            count = inserted,
            collection = COLLECTION_NAME,
            "Populated collection"
        );
        Ok(Self {
            store,
            embedder,
            base_dir: base_dir.to_path_buf(),
            top_k,
        })
    }

    /// Returns the top documents for a query, most similar first.
    ///
    /// The query is embedded with the same capability used at build
    /// time; results are deterministic for a fixed collection, with
    /// ties broken by insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error when query embedding fails.
    pub fn search(&self, query: &str) -> Result<Vec<IndexedDocument>> {
        let vector = self.embedder.embed(query)?;
        Ok(self
            .store
            .query(&vector, self.top_k)
            .into_iter()
            .map(|stored| stored.document.clone())
            .collect())
    }

    /// Number of indexed documents.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.store.count()
    }

    /// Base directory holding the collection.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Retrieval depth used by [`Self::search`].
    #[must_use]
    pub const fn top_k(&self) -> usize {
        self.top_k
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::models::DocMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic embedder that counts calls; vectors are a simple
    /// keyword indicator so similarity is predictable in tests.
    pub(crate) struct CountingEmbedder {
        pub calls: AtomicUsize,
    }

    impl CountingEmbedder {
        pub(crate) const fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Embedder for CountingEmbedder {
        fn dimensions(&self) -> usize {
            3
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let lower = text.to_lowercase();
            Ok(vec![
                if lower.contains("nmap") || lower.contains("port") {
                    1.0
                } else {
                    0.0
                },
                if lower.contains("john") || lower.contains("password") {
                    1.0
                } else {
                    0.0
                },
                1.0,
            ])
        }
    }

    fn doc(tool: &str, content: &str) -> IndexedDocument {
        IndexedDocument::new(
            content.to_string(),
            DocMetadata {
                tool: tool.to_string(),
                category: "Unknown".to_string(),
                url: String::new(),
            },
        )
    }

    #[test]
    fn test_fresh_build_counts_match() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(CountingEmbedder::new());
        let documents = vec![
            doc("nmap", "Tool Name: nmap\n\nDescription: port scanner"),
            doc("john", "Tool Name: john\n\nDescription: password cracker"),
        ];

        let index =
            KnowledgeIndex::build_or_load(dir.path(), documents, embedder.clone(), DEFAULT_TOP_K)
                .expect("build");
        assert_eq!(index.count(), 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reuse_makes_no_embedding_calls() {
        let dir = tempfile::tempdir().unwrap();
        let documents = vec![doc("nmap", "Tool Name: nmap")];
        {
            let embedder = Arc::new(CountingEmbedder::new());
            KnowledgeIndex::build_or_load(
                dir.path(),
                documents.clone(),
                embedder,
                DEFAULT_TOP_K,
            )
            .expect("first build");
        }

        let embedder = Arc::new(CountingEmbedder::new());
        let index =
            KnowledgeIndex::build_or_load(dir.path(), documents, embedder.clone(), DEFAULT_TOP_K)
                .expect("reload");
        assert_eq!(index.count(), 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_collection_is_repopulated() {
        let dir = tempfile::tempdir().unwrap();
        DiskVectorStore::create(dir.path(), COLLECTION_NAME, 0).expect("create empty");

        let embedder = Arc::new(CountingEmbedder::new());
        let index = KnowledgeIndex::build_or_load(
            dir.path(),
            vec![doc("nmap", "Tool Name: nmap")],
            embedder.clone(),
            DEFAULT_TOP_K,
        )
        .expect("repopulate");
        assert_eq!(index.count(), 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_corrupt_collection_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let collection_dir = dir.path().join(COLLECTION_NAME);
        std::fs::create_dir_all(&collection_dir).expect("mkdir");
        std::fs::write(collection_dir.join("manifest.json"), "garbage").expect("write");

        let embedder = Arc::new(CountingEmbedder::new());
        let index = KnowledgeIndex::build_or_load(
            dir.path(),
            vec![doc("nmap", "Tool Name: nmap")],
            embedder,
            DEFAULT_TOP_K,
        )
        .expect("rebuild");
        assert_eq!(index.count(), 1);
    }

    #[test]
    fn test_no_documents_is_index_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(CountingEmbedder::new());
        let err =
            KnowledgeIndex::build_or_load(dir.path(), Vec::new(), embedder, DEFAULT_TOP_K);
        assert!(matches!(err, Err(Error::IndexUnavailable(_))));
    }

    #[test]
    fn test_embedding_failure_is_index_unavailable() {
        struct FailingEmbedder;
        impl Embedder for FailingEmbedder {
            fn dimensions(&self) -> usize {
                3
            }
            fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Err(Error::OperationFailed {
                    operation: "embed".to_string(),
                    cause: "endpoint unreachable".to_string(),
                })
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let err = KnowledgeIndex::build_or_load(
            dir.path(),
            vec![doc("nmap", "Tool Name: nmap")],
            Arc::new(FailingEmbedder),
            DEFAULT_TOP_K,
        );
        assert!(matches!(err, Err(Error::IndexUnavailable(_))));
    }

    #[test]
    fn test_search_returns_most_similar_first() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(CountingEmbedder::new());
        let documents = vec![
            doc("john", "Tool Name: john\n\nDescription: password cracker"),
            doc("nmap", "Tool Name: nmap\n\nDescription: port scanner"),
        ];
        let index = KnowledgeIndex::build_or_load(dir.path(), documents, embedder, 1)
            .expect("build");

        let hits = index.search("how do I scan ports").expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.tool, "nmap");
    }

    #[test]
    fn test_rebuild_discards_previous_collection() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(CountingEmbedder::new());
        KnowledgeIndex::build_or_load(
            dir.path(),
            vec![doc("nmap", "Tool Name: nmap"), doc("john", "Tool Name: john")],
            embedder.clone(),
            DEFAULT_TOP_K,
        )
        .expect("initial");

        let index = KnowledgeIndex::rebuild(
            dir.path(),
            vec![doc("nikto", "Tool Name: nikto")],
            embedder,
            DEFAULT_TOP_K,
        )
        .expect("rebuild");
        assert_eq!(index.count(), 1);
    }
}
