//! Agent Graph - LangGraph-style stateful workflows.
//!
//! A [`StateGraph`] wires named async nodes together; compiling it binds a
//! checkpointer and yields a [`CompiledGraph`]. Every run is scoped to a
//! thread id: the thread's state is loaded from the checkpointer, the input
//! update is applied, then each node runs in turn and its update is applied
//! and checkpointed before the new snapshot is yielded to the caller.
//!
//! # Example
//!
//! ```ignore
//! use agent_graph::{InMemorySaver, MessagesState, RunConfig, StateGraph, START, END};
//!
//! let mut graph = StateGraph::<MessagesState>::new();
//! graph.add_node("model", |state| async move { Ok(reply_to(&state)) });
//! graph.add_edge(START, "model");
//! graph.add_edge("model", END);
//!
//! let compiled = graph.compile(Arc::new(InMemorySaver::new()))?;
//! let mut stream = compiled.stream(RunConfig::new("thread-1"), vec![question]);
//! while let Some(chunk) = stream.next().await {
//!     println!("{}", chunk?);
//! }
//! ```

pub mod checkpoint;
pub mod constants;
pub mod error;
pub mod graph;
pub mod stream;
pub mod types;

pub use checkpoint::InMemorySaver;
pub use constants::{END, START};
pub use error::{GraphError, NodeError, Result};
pub use graph::{
    CompiledGraph, GraphState, GraphStructure, MessagesState, StateGraph, add_messages,
};
pub use stream::StreamChunk;
pub use types::RunConfig;
