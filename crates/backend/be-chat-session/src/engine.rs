//! The per-thread chat session.

use std::sync::Arc;

use agent_chain::ChatOpenAI;
use agent_chain_core::{AnyMessage, ChatModel, Embeddings, HumanMessage, MessageContent};
use agent_graph::{CompiledGraph, InMemorySaver, MessagesState, RunConfig, StreamChunk};
use agent_graph_checkpoint::CheckpointSaver;
use futures::stream::{Stream, StreamExt};
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::SessionError;
use crate::registry::EmbeddingModel;
use crate::retriever::VectorRetriever;
use crate::workflow::{GraphBuilder, ModelGraph, NodeContext};

/// Generation settings fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HyperParameters {
    pub temperature: f64,
    pub top_k: usize,
}

impl From<&Settings> for HyperParameters {
    fn from(settings: &Settings) -> Self {
        Self {
            temperature: settings.temperature,
            top_k: settings.top_k,
        }
    }
}

/// Per-session choices layered on top of [`Settings`].
///
/// Every collaborator is optional; anything left unset is built from the
/// settings.
#[derive(bon::Builder)]
pub struct SessionOptions {
    #[builder(into)]
    embedding_model: String,
    #[builder(into)]
    llm_model: String,
    /// Base URL of a self-hosted OpenAI-compatible endpoint.
    #[builder(into)]
    model_url: Option<String>,
    /// Generated when absent.
    #[builder(into)]
    thread_id: Option<String>,
    /// Defaults to a fresh [`InMemorySaver`].
    checkpointer: Option<Arc<dyn CheckpointSaver>>,
    chat_model: Option<Arc<dyn ChatModel>>,
    embeddings: Option<Arc<dyn Embeddings>>,
    /// Defaults to [`ModelGraph`].
    graph_builder: Option<Arc<dyn GraphBuilder>>,
    hyper_parameters: Option<HyperParameters>,
}

/// A configured conversation bound to one thread.
///
/// The compiled graph holds no per-thread state, so a session can be
/// shared across tasks. Callers must not run two messages for the same
/// thread at once; the second checkpoint write is rejected as a version
/// conflict.
pub struct ChatSession {
    thread_id: String,
    embedding_model: EmbeddingModel,
    llm_model: String,
    model_url: Option<String>,
    hyper_parameters: HyperParameters,
    retriever: Arc<VectorRetriever>,
    graph: CompiledGraph<MessagesState>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("thread_id", &self.thread_id)
            .field("embedding_model", &self.embedding_model)
            .field("llm_model", &self.llm_model)
            .field("model_url", &self.model_url)
            .field("hyper_parameters", &self.hyper_parameters)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Build a ready session.
    ///
    /// The embedding model is validated before anything is opened or
    /// contacted. Opening the vector store happens here, so an unusable
    /// store fails construction.
    pub async fn new(settings: &Settings, options: SessionOptions) -> Result<Self, SessionError> {
        let embedding_model = EmbeddingModel::resolve(&options.embedding_model)?;

        let thread_id = options
            .thread_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let hyper_parameters = options
            .hyper_parameters
            .unwrap_or_else(|| HyperParameters::from(settings));

        let embeddings = match options.embeddings {
            Some(embeddings) => embeddings,
            None => embedding_model.client(settings).await?,
        };
        let retriever = Arc::new(
            VectorRetriever::open(
                &settings.vector_store_dir,
                settings.collection.clone(),
                embeddings,
            )
            .await?,
        );

        let chat_model = options.chat_model.unwrap_or_else(|| {
            default_chat_model(settings, &options.llm_model, options.model_url.as_deref())
        });
        let checkpointer = options
            .checkpointer
            .unwrap_or_else(|| Arc::new(InMemorySaver::new()) as Arc<dyn CheckpointSaver>);
        let graph_builder = options
            .graph_builder
            .unwrap_or_else(|| Arc::new(ModelGraph) as Arc<dyn GraphBuilder>);

        let ctx = NodeContext {
            chat_model,
            retriever: retriever.clone(),
            hyper_parameters,
        };
        let graph = graph_builder
            .build(&ctx)
            .compile(checkpointer)
            .map_err(|e| SessionError::initialization(thread_id.clone(), e))?;

        tracing::info!(
            thread_id = %thread_id,
            embedding_model = %embedding_model,
            llm_model = %options.llm_model,
            "Chat session ready"
        );

        Ok(Self {
            thread_id,
            embedding_model,
            llm_model: options.llm_model,
            model_url: options.model_url,
            hyper_parameters,
            retriever,
            graph,
        })
    }

    /// Add `message` to the thread and run the workflow.
    ///
    /// Yields the thread's state after the message was added and again after
    /// every node. Nothing runs until the stream is polled; dropping it
    /// early keeps whatever was checkpointed so far.
    pub fn handle_input_message(
        &self,
        message: impl Into<MessageContent>,
    ) -> impl Stream<Item = Result<MessagesState, SessionError>> + Send + '_ {
        let input: Vec<AnyMessage> = vec![HumanMessage::new(message).into()];
        tracing::debug!(thread_id = %self.thread_id, "Handling input message");
        self.graph
            .stream(RunConfig::new(self.thread_id.as_str()), input)
            .map(|chunk| chunk.map(StreamChunk::into_data).map_err(SessionError::from))
    }

    /// The thread's persisted messages, oldest first.
    pub async fn history(&self) -> Result<Vec<AnyMessage>, SessionError> {
        let state = self.graph.get_state(&self.thread_id).await?;
        Ok(state.map(|s| s.messages).unwrap_or_default())
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn embedding_model(&self) -> EmbeddingModel {
        self.embedding_model
    }

    pub fn llm_model(&self) -> &str {
        &self.llm_model
    }

    pub fn model_url(&self) -> Option<&str> {
        self.model_url.as_deref()
    }

    pub fn hyper_parameters(&self) -> HyperParameters {
        self.hyper_parameters
    }

    pub fn retriever(&self) -> &VectorRetriever {
        &self.retriever
    }
}

fn default_chat_model(
    settings: &Settings,
    llm_model: &str,
    model_url: Option<&str>,
) -> Arc<dyn ChatModel> {
    let model = ChatOpenAI::new(llm_model).timeout(settings.request_timeout_secs);
    let model = match model_url {
        Some(url) => model
            .api_base(url)
            .api_key(settings.llm_api_key.expose_secret()),
        None => model,
    };
    Arc::new(model)
}
