//! Similarity search over the session's document collection.

use std::path::Path;
use std::sync::Arc;

use agent_chain_core::{Document, Embeddings, SqliteVectorStore, VectorStore};

use crate::error::SessionError;

/// Read-mostly handle to a named vector collection.
///
/// Cloning is cheap and every clone searches the same store.
#[derive(Clone)]
pub struct VectorRetriever {
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl std::fmt::Debug for VectorRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorRetriever")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl VectorRetriever {
    /// Open the persistent collection `collection` under `persist_dir`.
    ///
    /// Every handle opened on the same directory and collection shares the
    /// same stored documents.
    pub async fn open(
        persist_dir: impl AsRef<Path>,
        collection: impl Into<String>,
        embeddings: Arc<dyn Embeddings>,
    ) -> Result<Self, SessionError> {
        let collection = collection.into();
        let store = SqliteVectorStore::open(persist_dir, collection.clone(), embeddings)
            .await
            .map_err(|e| {
                SessionError::vector_store(format!("Failed to open collection '{collection}'"), e)
            })?;
        Ok(Self {
            store: Arc::new(store),
            collection,
        })
    }

    /// Wrap an already constructed store.
    pub fn new(store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The `k` documents closest to `query`, each with its distance.
    ///
    /// Lower distance is more similar; results are in ascending order.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>, SessionError> {
        self.store
            .similarity_search_with_score(query, k)
            .await
            .map_err(|e| SessionError::vector_store("Similarity search failed", e))
    }

    pub async fn add_documents(&self, documents: Vec<Document>) -> Result<Vec<String>, SessionError> {
        let count = documents.len();
        let ids = self
            .store
            .add_documents(documents)
            .await
            .map_err(|e| SessionError::vector_store("Failed to add documents", e))?;
        tracing::info!(collection = %self.collection, count, "Ingested documents");
        Ok(ids)
    }
}
