//! Stream module for graph workflows.

/// A state snapshot emitted by a run.
///
/// `node` is [`crate::START`] for the snapshot taken right after the input
/// was applied, and the node's name for every snapshot after that.
#[derive(Debug, Clone)]
pub struct StreamChunk<T> {
    /// The name of the node that produced this snapshot.
    pub node: String,
    /// The full state after the step.
    pub data: T,
}

impl<T> StreamChunk<T> {
    /// Create a new stream chunk.
    pub fn new(node: impl Into<String>, data: T) -> Self {
        Self {
            node: node.into(),
            data,
        }
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T: std::fmt::Debug> std::fmt::Display for StreamChunk<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StreamChunk({}: {:?})", self.node, self.data)
    }
}
