use async_trait::async_trait;

use crate::Result;
use crate::documents::Document;

/// A store of embedded documents that supports nearest-neighbour search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and append `documents`, returning the ids assigned to them.
    async fn add_documents(&self, documents: Vec<Document>) -> Result<Vec<String>>;

    /// The `k` documents closest to `query`, paired with their distance.
    ///
    /// Results are ordered by ascending distance; lower is more similar.
    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>>;

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let results = self.similarity_search_with_score(query, k).await?;
        Ok(results.into_iter().map(|(doc, _)| doc).collect())
    }
}
