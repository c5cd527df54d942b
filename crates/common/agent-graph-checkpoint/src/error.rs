use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckpointError>;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to serialize checkpoint: {0}")]
    Serialize(#[from] rmp_serde::encode::Error),

    #[error("failed to deserialize checkpoint: {0}")]
    Deserialize(#[from] rmp_serde::decode::Error),

    #[error("checkpoint version conflict on thread '{thread_id}': stored {stored}, attempted {attempted}")]
    VersionConflict {
        thread_id: String,
        stored: u64,
        attempted: u64,
    },

    #[error("checkpoint storage error: {0}")]
    Storage(String),
}

impl CheckpointError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
