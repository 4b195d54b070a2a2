//! Per-user embedded vector index.
//!
//! Each user owns one index: an ordered list of `(text, embedding)`
//! documents persisted as a single JSON artifact. "Index exists" means the
//! artifact file is present on disk. Saves are write-then-rename so a
//! failed save never corrupts the previously persisted state.
//!
//! Writes for the same user are serialized through a per-user async mutex
//! held across load → mutate → save; without it two concurrent writers
//! would race and silently lose the earlier update.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::embedding::{Embedder, cosine_similarity};
use crate::error::StoreError;

/// File name of the persisted index artifact inside the user's directory.
const INDEX_FILE: &str = "index.json";

/// One embedded document: the transaction's textual rendering and its vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// An in-memory handle to one user's index.
///
/// Obtained from [`VectorIndexStore::create`] or [`VectorIndexStore::load`];
/// mutations are not persisted until [`VectorIndexStore::save`].
#[derive(Debug, Clone)]
pub struct UserIndex {
    user_id: String,
    documents: Vec<IndexedDocument>,
}

impl UserIndex {
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Full ordered sequence of stored document text.
    #[must_use]
    pub fn all_documents(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.text.as_str()).collect()
    }

    /// Cosine top-k nearest documents to the query vector, best first.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<&str> {
        let mut scored: Vec<(f32, &str)> = self
            .documents
            .iter()
            .map(|d| (cosine_similarity(query, &d.embedding), d.text.as_str()))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored.into_iter().map(|(_, text)| text).collect()
    }
}

/// Per-user on-disk similarity index store.
pub struct VectorIndexStore {
    root: PathBuf,
    embedder: Arc<dyn Embedder>,
    // user_id -> write lock; lazily populated, never removed
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for VectorIndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndexStore")
            .field("root", &self.root)
            .finish()
    }
}

impl VectorIndexStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            root: root.into(),
            embedder,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn index_path(&self, user_id: &str) -> PathBuf {
        self.root.join(user_id).join(INDEX_FILE)
    }

    /// Whether a persisted index artifact exists for the user.
    #[must_use]
    pub fn exists(&self, user_id: &str) -> bool {
        self.index_path(user_id).exists()
    }

    /// Embed the query text with the store's embedder.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let mut vectors = self
            .embedder
            .embed(vec![text.to_string()])
            .await
            .map_err(StoreError::Embedding)?;
        vectors
            .pop()
            .ok_or_else(|| StoreError::Embedding(anyhow::anyhow!("no embedding generated")))
    }

    /// Build a new in-memory index containing one embedded document.
    pub async fn create(&self, user_id: &str, text: &str) -> Result<UserIndex, StoreError> {
        let embedding = self.embed_query(text).await?;
        Ok(UserIndex {
            user_id: user_id.to_string(),
            documents: vec![IndexedDocument {
                text: text.to_string(),
                embedding,
            }],
        })
    }

    /// Load the user's persisted index.
    pub async fn load(&self, user_id: &str) -> Result<UserIndex, StoreError> {
        let path = self.index_path(user_id);
        let raw = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(user_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let documents: Vec<IndexedDocument> =
            serde_json::from_slice(&raw).map_err(|source| StoreError::CorruptIndex {
                path: path.display().to_string(),
                source,
            })?;

        Ok(UserIndex {
            user_id: user_id.to_string(),
            documents,
        })
    }

    /// Embed `text` and append it to the loaded index in memory.
    pub async fn add(&self, index: &mut UserIndex, text: &str) -> Result<(), StoreError> {
        let embedding = self.embed_query(text).await?;
        index.documents.push(IndexedDocument {
            text: text.to_string(),
            embedding,
        });
        Ok(())
    }

    /// Durably persist the full index, replacing prior persisted state.
    ///
    /// Writes to a temp file in the same directory and renames it over the
    /// artifact, so a failed save leaves the previous artifact intact.
    pub async fn save(&self, index: &UserIndex) -> Result<(), StoreError> {
        let path = self.index_path(&index.user_id);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let encoded = serde_json::to_vec(&index.documents).map_err(StoreError::Encode)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &encoded).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::debug!(
            user_id = %index.user_id,
            document_count = index.documents.len(),
            "Vector index persisted"
        );
        Ok(())
    }

    /// Append one document to the user's index, creating the index on first
    /// use, and persist the result.
    ///
    /// The whole load → mutate → save cycle runs under the user's write
    /// lock, so two concurrent updates for the same user cannot lose each
    /// other's additions.
    pub async fn upsert(&self, user_id: &str, text: &str) -> Result<(), StoreError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let index = if self.exists(user_id) {
            let mut index = self.load(user_id).await?;
            self.add(&mut index, text).await?;
            index
        } else {
            tracing::info!(user_id = %user_id, "No vector index found, creating a new one");
            self.create(user_id, text).await?
        };

        self.save(&index).await
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Deterministic embedder: maps text to a small vector derived from its
    /// bytes, so distinct texts get distinct directions.
    #[derive(Debug)]
    struct HashEmbedder;

    #[async_trait]
    impl Embedder for HashEmbedder {
        async fn embed(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| fake_vector(t)).collect())
        }
    }

    fn fake_vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 8];
        for (i, b) in text.bytes().enumerate() {
            v[i % 8] += f32::from(b) / 255.0;
        }
        v
    }

    /// Embedder that always fails, for exercising the create failure path.
    #[derive(Debug)]
    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
            Err(anyhow::anyhow!("embedding service unavailable"))
        }
    }

    fn store(root: &std::path::Path) -> VectorIndexStore {
        VectorIndexStore::new(root, Arc::new(HashEmbedder))
    }

    #[tokio::test]
    async fn test_load_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let err = store.load("nobody").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let index = store.create("alice", "100 expense food lunch on 2025-01-01").await.unwrap();
        store.save(&index).await.unwrap();
        assert!(store.exists("alice"));

        let loaded = store.load("alice").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.all_documents(),
            vec!["100 expense food lunch on 2025-01-01"]
        );
    }

    #[tokio::test]
    async fn test_add_is_in_memory_until_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let mut index = store.create("alice", "doc one").await.unwrap();
        store.save(&index).await.unwrap();

        store.add(&mut index, "doc two").await.unwrap();
        assert_eq!(store.load("alice").await.unwrap().len(), 1);

        store.save(&index).await.unwrap();
        assert_eq!(store.load("alice").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.upsert("alice", "first").await.unwrap();
        store.upsert("alice", "second").await.unwrap();
        store.upsert("alice", "third").await.unwrap();

        let loaded = store.load("alice").await.unwrap();
        assert_eq!(loaded.all_documents(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store(dir.path()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.upsert("alice", &format!("doc {i}")).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let loaded = store.load("alice").await.unwrap();
        assert_eq!(loaded.len(), 8);
    }

    #[tokio::test]
    async fn test_embedding_failure_surfaces_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorIndexStore::new(dir.path(), Arc::new(BrokenEmbedder));

        let err = store.upsert("alice", "anything").await.unwrap_err();
        assert!(matches!(err, StoreError::Embedding(_)));
        assert!(!store.exists("alice"));
    }

    #[tokio::test]
    async fn test_search_ranks_similar_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.upsert("alice", "aaaa").await.unwrap();
        store.upsert("alice", "zzzz").await.unwrap();

        let loaded = store.load("alice").await.unwrap();
        let query = fake_vector("aaaa");
        let hits = loaded.search(&query, 1);
        assert_eq!(hits, vec!["aaaa"]);
    }
}
