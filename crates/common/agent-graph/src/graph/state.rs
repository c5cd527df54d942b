//! State graph module for stateful workflows.
//!
//! This module provides the StateGraph builder which allows you to create
//! graphs where nodes communicate by reading a shared state and returning
//! updates to it.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use agent_graph_checkpoint::{Checkpoint, CheckpointSaver};
use async_stream::try_stream;
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::constants::{END, START};
use crate::error::{GraphError, NodeError, Result};
use crate::stream::StreamChunk;
use crate::types::RunConfig;

/// State that a graph threads through its nodes.
///
/// Nodes never mutate the state directly; they return an `Update` that the
/// runtime folds in with [`GraphState::apply`].
pub trait GraphState:
    Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The partial update a node returns.
    type Update: Send + 'static;

    /// Fold `update` into the state. On error the state is unchanged.
    fn apply(&mut self, update: Self::Update) -> Result<()>;
}

/// Boxed future returned by a node.
pub type NodeFuture<U> = Pin<Box<dyn Future<Output = std::result::Result<U, NodeError>> + Send>>;

/// A node action: receives a snapshot of the state, returns an update.
pub type NodeAction<S> =
    Arc<dyn Fn(S) -> NodeFuture<<S as GraphState>::Update> + Send + Sync>;

/// A graph whose nodes communicate by reading and updating a shared state.
///
/// The signature of each node is `State -> Result<Update, NodeError>`.
/// Building never panics: structural problems (reserved or duplicate node
/// names, dangling edges, a missing entry point) are reported by
/// [`StateGraph::compile`].
///
/// # Example
///
/// ```ignore
/// use agent_graph::{StateGraph, START, END};
///
/// let mut graph = StateGraph::<MessagesState>::new();
/// graph.add_node("model", |state| async move { Ok(vec![answer(&state)]) });
/// graph.add_edge(START, "model");
/// graph.add_edge("model", END);
///
/// let compiled = graph.compile(Arc::new(InMemorySaver::new()))?;
/// ```
pub struct StateGraph<S: GraphState> {
    /// Nodes in the graph.
    nodes: HashMap<String, NodeAction<S>>,
    /// Edges in the graph (from -> to), in insertion order.
    edges: Vec<(String, String)>,
    /// Problems recorded while building.
    problems: Vec<String>,
}

impl<S: GraphState> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GraphState> StateGraph<S> {
    /// Create a new StateGraph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// Add a new node to the StateGraph.
    ///
    /// A reserved name (START or END) or a name that is already taken is
    /// recorded and reported by `compile`.
    pub fn add_node<F, Fut>(&mut self, name: impl Into<String>, action: F) -> &mut Self
    where
        F: Fn(S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<S::Update, NodeError>> + Send + 'static,
    {
        let name = name.into();

        if name == START || name == END {
            self.problems.push(format!("node name '{name}' is reserved"));
            return self;
        }

        if self.nodes.contains_key(&name) {
            self.problems.push(format!("node '{name}' already exists"));
            return self;
        }

        let action: NodeAction<S> = Arc::new(move |state| Box::pin(action(state)));
        self.nodes.insert(name, action);
        self
    }

    /// Add a directed edge from the start node to the end node.
    pub fn add_edge(&mut self, start: impl Into<String>, end: impl Into<String>) -> &mut Self {
        let start = start.into();
        let end = end.into();

        if start == END {
            self.problems.push("END cannot be a start node".to_string());
        } else if end == START {
            self.problems.push("START cannot be an end node".to_string());
        } else {
            self.edges.push((start, end));
        }
        self
    }

    /// Set the entry point of the graph.
    ///
    /// Equivalent to `add_edge(START, key)`.
    pub fn set_entry_point(&mut self, key: impl Into<String>) -> &mut Self {
        self.add_edge(START, key)
    }

    /// Set a finish point of the graph.
    ///
    /// Equivalent to `add_edge(key, END)`.
    pub fn set_finish_point(&mut self, key: impl Into<String>) -> &mut Self {
        self.add_edge(key, END)
    }

    /// Validate the graph structure.
    fn validate(&self) -> Result<()> {
        if let Some(problem) = self.problems.first() {
            return Err(GraphError::invalid_graph(problem.clone()));
        }

        if !self.edges.iter().any(|(from, _)| from == START) {
            return Err(GraphError::invalid_graph(
                "graph must have an entrypoint: add at least one edge from START to another node",
            ));
        }

        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(GraphError::invalid_graph(format!(
                    "edge source '{from}' not found in nodes"
                )));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(GraphError::invalid_graph(format!(
                    "edge target '{to}' not found in nodes"
                )));
            }
        }

        Ok(())
    }

    /// Compile the StateGraph into a CompiledGraph bound to `checkpointer`.
    pub fn compile(self, checkpointer: Arc<dyn CheckpointSaver>) -> Result<CompiledGraph<S>> {
        self.validate()?;

        tracing::info!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "Compiled state graph"
        );

        Ok(CompiledGraph {
            nodes: self.nodes,
            edges: self.edges,
            checkpointer,
        })
    }
}

/// A compiled state graph that can be invoked or streamed.
///
/// Holds no per-thread state; it can serve any number of threads
/// concurrently.
pub struct CompiledGraph<S: GraphState> {
    nodes: HashMap<String, NodeAction<S>>,
    edges: Vec<(String, String)>,
    checkpointer: Arc<dyn CheckpointSaver>,
}

impl<S: GraphState> std::fmt::Debug for CompiledGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let structure = self.get_graph();
        f.debug_struct("CompiledGraph")
            .field("nodes", &structure.nodes)
            .field("edges", &structure.edges)
            .finish_non_exhaustive()
    }
}

impl<S: GraphState> CompiledGraph<S> {
    /// Nodes that follow `current`, in edge insertion order.
    fn successors<'a>(&'a self, current: &'a str) -> impl Iterator<Item = String> + 'a {
        self.edges
            .iter()
            .filter(move |(from, _)| from == current)
            .map(|(_, to)| to.clone())
    }

    async fn load(&self, thread_id: &str) -> Result<(S, u64)> {
        match self.checkpointer.get(thread_id).await? {
            Some(checkpoint) => Ok((checkpoint.state()?, checkpoint.version)),
            None => Ok((S::default(), 0)),
        }
    }

    async fn save(&self, thread_id: &str, version: u64, state: &S) -> Result<()> {
        let checkpoint = Checkpoint::from_state(thread_id, version, state)?;
        self.checkpointer.put(checkpoint).await?;
        Ok(())
    }

    /// Stream the graph execution for one thread.
    ///
    /// The first chunk is the thread's state with `input` applied (tagged
    /// [`START`]); each following chunk is the state after one node ran.
    /// A chunk is only yielded once its state has been checkpointed.
    /// Nothing runs until the stream is polled, and dropping the stream
    /// stops the run after the last completed step.
    pub fn stream(
        &self,
        config: RunConfig,
        input: S::Update,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk<S>>> + Send + '_>> {
        Box::pin(try_stream! {
            let thread_id = config
                .thread_id
                .filter(|id| !id.is_empty())
                .ok_or(GraphError::MissingThreadId)?;

            let (mut state, mut version) = self.load(&thread_id).await?;
            state.apply(input)?;
            version += 1;
            self.save(&thread_id, version, &state).await?;
            tracing::debug!(thread_id = %thread_id, version, "Applied input");
            yield StreamChunk::new(START, state.clone());

            let mut queue: VecDeque<String> = self.successors(START).collect();
            let mut steps = 0usize;

            while let Some(current) = queue.pop_front() {
                if current == END {
                    continue;
                }

                steps += 1;
                if steps > config.recursion_limit {
                    Err(GraphError::RecursionLimit {
                        limit: config.recursion_limit,
                    })?;
                }

                let action = self
                    .nodes
                    .get(&current)
                    .cloned()
                    .ok_or_else(|| GraphError::invalid_graph(format!("unknown node '{current}'")))?;

                tracing::debug!(thread_id = %thread_id, node = %current, "Running node");
                let update = action(state.clone())
                    .await
                    .map_err(|source| GraphError::node(current.clone(), source))?;

                state.apply(update)?;
                version += 1;
                self.save(&thread_id, version, &state).await?;

                queue.extend(self.successors(&current));
                yield StreamChunk::new(current, state.clone());
            }
        })
    }

    /// Run the graph to completion and return the final state.
    pub async fn invoke(&self, config: RunConfig, input: S::Update) -> Result<S> {
        let mut stream = self.stream(config, input);
        let mut last = None;
        while let Some(chunk) = stream.next().await {
            last = Some(chunk?.data);
        }
        last.ok_or_else(|| GraphError::invalid_graph("run produced no state"))
    }

    /// The latest checkpointed state of `thread_id`, if any.
    pub async fn get_state(&self, thread_id: &str) -> Result<Option<S>> {
        match self.checkpointer.get(thread_id).await? {
            Some(checkpoint) => Ok(Some(checkpoint.state()?)),
            None => Ok(None),
        }
    }

    pub fn checkpointer(&self) -> &Arc<dyn CheckpointSaver> {
        &self.checkpointer
    }

    /// Get the graph structure for visualization.
    pub fn get_graph(&self) -> GraphStructure {
        let mut nodes: Vec<String> = self.nodes.keys().cloned().collect();
        nodes.sort();
        GraphStructure {
            nodes,
            edges: self.edges.clone(),
        }
    }
}

/// Structure representing the graph for visualization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStructure {
    /// Node names, sorted.
    pub nodes: Vec<String>,
    /// Edges as (from, to) pairs.
    pub edges: Vec<(String, String)>,
}
