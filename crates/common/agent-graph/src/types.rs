//! Run configuration.

use crate::constants::DEFAULT_RECURSION_LIMIT;

/// Configuration for a single graph run.
///
/// # Example
///
/// ```
/// use agent_graph::types::RunConfig;
///
/// let config = RunConfig::new("thread-1").with_recursion_limit(10);
/// assert_eq!(config.thread_id.as_deref(), Some("thread-1"));
/// ```
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Thread whose checkpoint the run reads and writes.
    pub thread_id: Option<String>,
    /// Maximum number of node executions in one run.
    pub recursion_limit: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            thread_id: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl RunConfig {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Self::default()
        }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }
}
