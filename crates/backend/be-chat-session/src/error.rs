//! Error types for the chat session engine.

use agent_graph::GraphError;
use agent_graph_checkpoint::CheckpointError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("Failed to initialize session for thread '{thread_id}': {source}")]
    Initialization {
        thread_id: String,
        #[source]
        source: GraphError,
    },

    #[error("Model '{model}' invocation failed: {source}")]
    ModelInvocation {
        model: String,
        #[source]
        source: agent_chain_core::Error,
    },

    #[error("Vector store error: {message}: {source}")]
    VectorStore {
        message: String,
        #[source]
        source: agent_chain_core::Error,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[source] CheckpointError),

    #[error("Graph error: {0}")]
    Graph(#[source] GraphError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SessionError {
    pub fn unknown_model(id: impl Into<String>) -> Self {
        Self::UnknownModel(id.into())
    }

    pub fn initialization(thread_id: impl Into<String>, source: GraphError) -> Self {
        Self::Initialization {
            thread_id: thread_id.into(),
            source,
        }
    }

    pub fn model_invocation(model: impl Into<String>, source: agent_chain_core::Error) -> Self {
        Self::ModelInvocation {
            model: model.into(),
            source,
        }
    }

    pub fn vector_store(message: impl Into<String>, source: agent_chain_core::Error) -> Self {
        Self::VectorStore {
            message: message.into(),
            source,
        }
    }

    pub fn is_unknown_model(&self) -> bool {
        matches!(self, Self::UnknownModel(_))
    }

    pub fn is_model_invocation(&self) -> bool {
        matches!(self, Self::ModelInvocation { .. })
    }

    pub fn is_vector_store(&self) -> bool {
        matches!(self, Self::VectorStore { .. })
    }

    pub fn is_initialization(&self) -> bool {
        matches!(self, Self::Initialization { .. })
    }
}

impl From<CheckpointError> for SessionError {
    fn from(err: CheckpointError) -> Self {
        Self::Checkpoint(err)
    }
}

/// Node failures raised by this crate come back boxed inside
/// [`GraphError::Node`]; they are unwrapped to their original variant.
impl From<GraphError> for SessionError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Node { node, source } => match source.downcast::<SessionError>() {
                Ok(session_err) => *session_err,
                Err(source) => Self::Graph(GraphError::Node { node, source }),
            },
            GraphError::Checkpoint(err) => Self::Checkpoint(err),
            other => Self::Graph(other),
        }
    }
}
