//! In-memory checkpoint saver for agent state persistence.
//!
//! This module provides an in-memory implementation of a checkpoint saver
//! that keeps the latest checkpoint of every thread for the lifetime of the
//! process.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use agent_graph_checkpoint::{Checkpoint, CheckpointError, CheckpointSaver};
use async_trait::async_trait;

/// In-memory checkpoint saver for persisting agent state.
///
/// Cloning the saver shares its storage, so every session built from the
/// same saver sees the same threads.
///
/// Note: Only use `InMemorySaver` where losing history on restart is
/// acceptable. For durable history, implement [`CheckpointSaver`] on a
/// persistent store.
///
/// # Example
///
/// ```ignore
/// use agent_graph::checkpoint::InMemorySaver;
///
/// let saver = InMemorySaver::new();
/// saver.put(Checkpoint::from_state("thread-1", 1, &state)?).await?;
/// let latest = saver.get("thread-1").await?;
/// ```
#[derive(Clone, Default)]
pub struct InMemorySaver {
    /// Thread ID -> latest checkpoint
    storage: Arc<RwLock<HashMap<String, Checkpoint>>>,
}

impl InMemorySaver {
    /// Create a new in-memory checkpoint saver.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(err: E) -> CheckpointError {
    CheckpointError::storage(format!("checkpoint lock poisoned: {err}"))
}

#[async_trait]
impl CheckpointSaver for InMemorySaver {
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let storage = self.storage.read().map_err(poisoned)?;
        Ok(storage.get(thread_id).cloned())
    }

    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        let mut storage = self.storage.write().map_err(poisoned)?;
        if let Some(stored) = storage.get(&checkpoint.thread_id)
            && stored.version >= checkpoint.version
        {
            return Err(CheckpointError::VersionConflict {
                thread_id: checkpoint.thread_id,
                stored: stored.version,
                attempted: checkpoint.version,
            });
        }
        storage.insert(checkpoint.thread_id.clone(), checkpoint);
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<bool, CheckpointError> {
        let mut storage = self.storage.write().map_err(poisoned)?;
        Ok(storage.remove(thread_id).is_some())
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError> {
        let storage = self.storage.read().map_err(poisoned)?;
        let mut threads: Vec<String> = storage.keys().cloned().collect();
        threads.sort();
        Ok(threads)
    }
}

impl std::fmt::Debug for InMemorySaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let threads = self.storage.read().map(|s| s.len()).unwrap_or_default();
        f.debug_struct("InMemorySaver")
            .field("threads", &threads)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestState {
        messages: Vec<String>,
        count: u32,
    }

    fn checkpoint(thread_id: &str, version: u64, count: u32) -> Checkpoint {
        let state = TestState {
            messages: vec![format!("{thread_id}-{count}")],
            count,
        };
        Checkpoint::from_state(thread_id, version, &state).unwrap()
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let saver = InMemorySaver::new();
        saver.put(checkpoint("thread-1", 1, 1)).await.unwrap();

        let stored = saver.get("thread-1").await.unwrap().unwrap();
        let state: TestState = stored.state().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(state.count, 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let saver = InMemorySaver::new();
        assert!(saver.get("thread-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_version_rejected() {
        let saver = InMemorySaver::new();
        saver.put(checkpoint("thread-1", 2, 2)).await.unwrap();

        let err = saver.put(checkpoint("thread-1", 2, 3)).await.unwrap_err();
        assert!(err.is_version_conflict());

        let stored = saver.get("thread-1").await.unwrap().unwrap();
        assert_eq!(stored.state::<TestState>().unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_multiple_threads_and_delete() {
        let saver = InMemorySaver::new();
        saver.put(checkpoint("thread-2", 1, 2)).await.unwrap();
        saver.put(checkpoint("thread-1", 1, 1)).await.unwrap();

        assert_eq!(
            saver.list_threads().await.unwrap(),
            vec!["thread-1".to_string(), "thread-2".to_string()]
        );

        assert!(saver.delete_thread("thread-1").await.unwrap());
        assert!(!saver.delete_thread("thread-1").await.unwrap());
        assert_eq!(saver.list_threads().await.unwrap(), vec!["thread-2".to_string()]);
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let saver = InMemorySaver::new();
        let shared = saver.clone();
        saver.put(checkpoint("thread-1", 1, 1)).await.unwrap();
        assert!(shared.get("thread-1").await.unwrap().is_some());
    }
}
