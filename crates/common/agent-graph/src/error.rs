use agent_graph_checkpoint::CheckpointError;
use thiserror::Error;

/// Error returned by a node action.
pub type NodeError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    #[error("invalid state update: {0}")]
    InvalidUpdate(String),

    #[error("node '{node}' failed: {source}")]
    Node {
        node: String,
        #[source]
        source: NodeError,
    },

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("recursion limit of {limit} steps reached without hitting END")]
    RecursionLimit { limit: usize },

    #[error("a thread id is required to run a checkpointed graph")]
    MissingThreadId,
}

impl GraphError {
    pub fn invalid_graph(msg: impl Into<String>) -> Self {
        Self::InvalidGraph(msg.into())
    }

    pub fn invalid_update(msg: impl Into<String>) -> Self {
        Self::InvalidUpdate(msg.into())
    }

    pub fn node(node: impl Into<String>, source: NodeError) -> Self {
        Self::Node {
            node: node.into(),
            source,
        }
    }

    pub fn is_invalid_graph(&self) -> bool {
        matches!(self, Self::InvalidGraph(_))
    }

    pub fn is_invalid_update(&self) -> bool {
        matches!(self, Self::InvalidUpdate(_))
    }

    /// Name of the failing node for node errors.
    pub fn failed_node(&self) -> Option<&str> {
        match self {
            Self::Node { node, .. } => Some(node),
            _ => None,
        }
    }
}
