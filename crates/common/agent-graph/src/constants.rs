//! Constants for graph workflows.

/// The first (virtual) node in a graph.
/// Used to indicate where the graph execution should start.
pub const START: &str = "__start__";

/// The last (virtual) node in a graph.
/// Used to indicate where the graph execution should end.
pub const END: &str = "__end__";

/// Steps a single run may take before it is aborted.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;
