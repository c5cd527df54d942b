//! A vector store persisted in SQLite.
//!
//! Every collection under one persistence directory lives in the database
//! `<persist_dir>/vectors.sqlite3`. Ingestion runs in a transaction, so any
//! number of handles, in one process or several, can append to the same
//! collection and every handle sees every committed row.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use crate::documents::Document;
use crate::embeddings::Embeddings;
use crate::vectorstores::base::VectorStore;
use crate::vectorstores::utils::cosine_distance;
use crate::{Error, Result};

/// File name of the database inside the persistence directory.
pub const DATABASE_FILE: &str = "vectors.sqlite3";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY NOT NULL,
        dimension INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS embeddings (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        collection TEXT NOT NULL REFERENCES collections (name),
        document TEXT NOT NULL,
        metadata TEXT NOT NULL,
        embedding BLOB NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS embeddings_collection_seq ON embeddings (collection, seq)",
];

/// `(id, document, metadata, embedding)` as stored.
type EmbeddingRow = (String, String, String, Vec<u8>);

/// Append-only, SQLite-backed vector store.
///
/// Rows keep their insertion order, which breaks ties between equally
/// distant results. Documents are never deduplicated: ingesting the same
/// text twice stores it twice under two ids.
pub struct SqliteVectorStore {
    collection: String,
    path: PathBuf,
    pool: SqlitePool,
    embedding: Arc<dyn Embeddings>,
}

impl SqliteVectorStore {
    /// Open (or create) `collection` under `persist_dir`.
    ///
    /// The directory is created when missing. The database is opened and
    /// its schema checked here, so an unusable location fails now rather
    /// than on the first search.
    pub async fn open(
        persist_dir: impl AsRef<Path>,
        collection: impl Into<String>,
        embedding: Arc<dyn Embeddings>,
    ) -> Result<Self> {
        let collection = collection.into();
        validate_collection_name(&collection)?;

        let dir = persist_dir.as_ref();
        match tokio::fs::metadata(dir).await {
            Ok(metadata) if !metadata.is_dir() => {
                return Err(Error::invalid_config(format!(
                    "persistence path '{}' is not a directory",
                    dir.display()
                )));
            }
            _ => {}
        }
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(DATABASE_FILE);
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(*statement).execute(&pool).await?;
        }
        sqlx::query("INSERT OR IGNORE INTO collections (name) VALUES (?)")
            .bind(&collection)
            .execute(&pool)
            .await?;

        let store = Self {
            collection,
            path,
            pool,
            embedding,
        };

        tracing::info!(
            collection = %store.collection,
            path = %store.path.display(),
            entries = store.len().await?,
            "Opened vector store collection"
        );

        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Path of the SQLite database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Documents for the given ids, in the order the ids were given.
    /// Unknown ids are skipped.
    pub async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Document>> {
        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            let row: Option<(String, String, String)> = sqlx::query_as(
                "SELECT id, document, metadata FROM embeddings WHERE collection = ? AND id = ?",
            )
            .bind(&self.collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            if let Some((id, text, metadata)) = row {
                documents.push(to_document(id, text, &metadata)?);
            }
        }
        Ok(documents)
    }

    /// Nearest entries to an already embedded query.
    pub async fn similarity_search_by_vector_with_score(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(Document, f32)>> {
        if k == 0 {
            return Ok(vec![]);
        }

        let rows: Vec<EmbeddingRow> = sqlx::query_as(
            "SELECT id, document, metadata, embedding FROM embeddings WHERE collection = ? ORDER BY seq",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let vectors = rows
            .iter()
            .map(|(id, _, _, bytes)| decode_vector(id, bytes))
            .collect::<Result<Vec<_>>>()?;
        let distances = cosine_distance(embedding, &vectors)?;

        // sort_by is stable and rows arrive in insertion order, so equal
        // distances keep insertion order.
        let mut ranked: Vec<(usize, f32)> = distances.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked.truncate(k);

        let mut rows: Vec<Option<EmbeddingRow>> = rows.into_iter().map(Some).collect();
        let mut results = Vec::with_capacity(ranked.len());
        for (idx, distance) in ranked {
            if let Some((id, text, metadata, _)) = rows[idx].take() {
                results.push((to_document(id, text, &metadata)?, distance));
            }
        }
        Ok(results)
    }

    async fn append(&self, documents: Vec<Document>, vectors: Vec<Vec<f32>>) -> Result<Vec<String>> {
        if vectors.len() != documents.len() {
            return Err(Error::other(format!(
                "embedding model returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }
        let Some(dimension) = vectors.first().map(Vec::len) else {
            return Ok(vec![]);
        };
        if vectors.iter().any(|v| v.len() != dimension) {
            return Err(Error::other("embedding model returned vectors of mixed sizes"));
        }

        let mut tx = self.pool.begin().await?;

        // Writing first takes the database write lock, so concurrent
        // appenders queue behind each other instead of failing.
        sqlx::query("UPDATE collections SET dimension = COALESCE(dimension, ?) WHERE name = ?")
            .bind(dimension as i64)
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        let stored: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM collections WHERE name = ?")
                .bind(&self.collection)
                .fetch_one(&mut *tx)
                .await?;
        if stored != Some(dimension as i64) {
            return Err(Error::invalid_config(format!(
                "collection '{}' holds {}-dimensional vectors, got {dimension}",
                self.collection,
                stored.unwrap_or_default()
            )));
        }

        let mut ids = Vec::with_capacity(documents.len());
        for (doc, vector) in documents.into_iter().zip(vectors) {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO embeddings (id, collection, document, metadata, embedding)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&self.collection)
            .bind(&doc.page_content)
            .bind(serde_json::to_string(&doc.metadata)?)
            .bind(encode_vector(&vector))
            .execute(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;
        Ok(ids)
    }
}

impl std::fmt::Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorStore")
            .field("collection", &self.collection)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add_documents(&self, documents: Vec<Document>) -> Result<Vec<String>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }
        let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
        let vectors = self.embedding.embed_documents(texts).await?;
        let ids = self.append(documents, vectors).await?;
        tracing::debug!(collection = %self.collection, added = ids.len(), "Added documents");
        Ok(ids)
    }

    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>> {
        let embedding = self.embedding.embed_query(query).await?;
        self.similarity_search_by_vector_with_score(&embedding, k)
            .await
    }
}

fn to_document(id: String, text: String, metadata: &str) -> Result<Document> {
    let metadata: HashMap<String, Value> = serde_json::from_str(metadata)?;
    Ok(Document {
        id: Some(id),
        page_content: text,
        metadata,
    })
}

/// Little-endian `f32`s.
fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(id: &str, bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::other(format!("stored embedding of '{id}' is corrupt")));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// 3-63 characters of `[A-Za-z0-9._-]`, starting and ending alphanumeric.
fn validate_collection_name(name: &str) -> Result<()> {
    let valid_len = (3..=63).contains(&name.len());
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    let valid_ends = name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric());

    if valid_len && valid_chars && valid_ends {
        Ok(())
    } else {
        Err(Error::invalid_config(format!(
            "invalid collection name '{name}'"
        )))
    }
}
