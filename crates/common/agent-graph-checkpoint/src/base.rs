use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Result;

/// The latest persisted state of one thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub thread_id: String,
    /// Strictly increasing per thread; the first checkpoint is version 1.
    pub version: u64,
    /// State encoded by [`crate::codec::dumps`].
    pub payload: Vec<u8>,
}

impl Checkpoint {
    pub fn from_state<S: Serialize>(
        thread_id: impl Into<String>,
        version: u64,
        state: &S,
    ) -> Result<Self> {
        Ok(Self {
            thread_id: thread_id.into(),
            version,
            payload: crate::codec::dumps(state)?,
        })
    }

    pub fn state<S: DeserializeOwned>(&self) -> Result<S> {
        crate::codec::loads(&self.payload)
    }
}

/// Storage for thread checkpoints.
///
/// `put` replaces the thread's checkpoint and must reject a version that
/// does not exceed the stored one, so history for a thread only ever moves
/// forward.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    async fn put(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Returns whether a checkpoint existed.
    async fn delete_thread(&self, thread_id: &str) -> Result<bool>;

    async fn list_threads(&self) -> Result<Vec<String>>;
}
