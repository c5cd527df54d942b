//! Workflow graphs a chat session can run.
//!
//! The default workflow is a single model node: `START -> model -> END`.
//! Sessions can swap in any [`GraphBuilder`], which receives the session's
//! model, retriever and hyper-parameters through a [`NodeContext`].

use std::sync::Arc;

use agent_chain_core::{AnyMessage, ChatModel, GenerationParams, SystemMessage};
use agent_graph::{END, MessagesState, NodeError, START, StateGraph};

use crate::engine::HyperParameters;
use crate::error::SessionError;
use crate::retriever::VectorRetriever;

pub const MODEL_NODE: &str = "model";
pub const RETRIEVE_NODE: &str = "retrieve";

/// Everything a node may need from its session.
#[derive(Clone)]
pub struct NodeContext {
    pub chat_model: Arc<dyn ChatModel>,
    pub retriever: Arc<VectorRetriever>,
    pub hyper_parameters: HyperParameters,
}

/// Builds the (uncompiled) workflow graph for a session.
pub trait GraphBuilder: Send + Sync {
    fn build(&self, ctx: &NodeContext) -> StateGraph<MessagesState>;
}

impl<F> GraphBuilder for F
where
    F: Fn(&NodeContext) -> StateGraph<MessagesState> + Send + Sync,
{
    fn build(&self, ctx: &NodeContext) -> StateGraph<MessagesState> {
        self(ctx)
    }
}

/// `START -> model -> END`
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelGraph;

impl GraphBuilder for ModelGraph {
    fn build(&self, ctx: &NodeContext) -> StateGraph<MessagesState> {
        let mut graph = StateGraph::<MessagesState>::new();
        add_model_node(&mut graph, ctx);
        graph.add_edge(START, MODEL_NODE);
        graph.add_edge(MODEL_NODE, END);
        graph
    }
}

/// `START -> retrieve -> model -> END`
///
/// The retrieve node looks up the latest human message and, when anything
/// matches, appends a system message carrying the matched passages.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrievalGraph;

impl GraphBuilder for RetrievalGraph {
    fn build(&self, ctx: &NodeContext) -> StateGraph<MessagesState> {
        let mut graph = StateGraph::<MessagesState>::new();
        let retrieve_ctx = ctx.clone();
        graph.add_node(RETRIEVE_NODE, move |state| {
            retrieve_context(retrieve_ctx.clone(), state)
        });
        add_model_node(&mut graph, ctx);
        graph.add_edge(START, RETRIEVE_NODE);
        graph.add_edge(RETRIEVE_NODE, MODEL_NODE);
        graph.add_edge(MODEL_NODE, END);
        graph
    }
}

/// Register the model node on `graph`.
pub fn add_model_node(graph: &mut StateGraph<MessagesState>, ctx: &NodeContext) {
    let ctx = ctx.clone();
    graph.add_node(MODEL_NODE, move |state| call_model(ctx.clone(), state));
}

/// Send the full history to the chat model and return its reply.
pub async fn call_model(
    ctx: NodeContext,
    state: MessagesState,
) -> Result<Vec<AnyMessage>, NodeError> {
    let params = GenerationParams {
        temperature: ctx.hyper_parameters.temperature,
    };
    let reply = ctx
        .chat_model
        .invoke(&state.messages, &params)
        .await
        .map_err(|e| {
            tracing::warn!(model = ctx.chat_model.model_name(), error = %e, "Model call failed");
            Box::new(SessionError::model_invocation(ctx.chat_model.model_name(), e)) as NodeError
        })?;
    Ok(vec![reply.into()])
}

async fn retrieve_context(
    ctx: NodeContext,
    state: MessagesState,
) -> Result<Vec<AnyMessage>, NodeError> {
    let query = state.messages.iter().rev().find_map(|message| match message {
        AnyMessage::Human(human) => Some(human.content().to_string()),
        _ => None,
    });
    let Some(query) = query.filter(|q| !q.trim().is_empty()) else {
        return Ok(vec![]);
    };

    let results = ctx
        .retriever
        .similarity_search(&query, ctx.hyper_parameters.top_k)
        .await
        .map_err(|e| Box::new(e) as NodeError)?;
    if results.is_empty() {
        return Ok(vec![]);
    }

    tracing::debug!(matches = results.len(), "Retrieved context");
    let passages: Vec<&str> = results
        .iter()
        .map(|(doc, _)| doc.page_content.as_str())
        .collect();
    let context = format!(
        "Use the following context to answer the question.\n\n{}",
        passages.join("\n\n")
    );
    Ok(vec![SystemMessage::new(context).into()])
}
