//! Per-thread chat sessions backed by a checkpointed workflow graph.
//!
//! A [`ChatSession`] binds one thread id to a compiled graph, a vector
//! retriever and a chat model. Each message is streamed through the graph
//! as a sequence of state snapshots, and [`aggregate`] / [`respond`] reduce
//! that stream to the reply a caller sees.
//!
//! ```ignore
//! let settings = Settings::from_env()?;
//! let session = ChatSession::new(
//!     &settings,
//!     SessionOptions::builder()
//!         .embedding_model(settings.embedding_model.clone())
//!         .llm_model(settings.llm_model.clone())
//!         .thread_id("t1")
//!         .build(),
//! )
//! .await?;
//! match respond(&session, "hi").await {
//!     ChatResponse::Success { text, .. } => println!("{text}"),
//!     ChatResponse::Failure { message } => eprintln!("{message}"),
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod retriever;
pub mod workflow;

pub use aggregator::{ChatResponse, MalformedEvent, SnapshotEvent, aggregate, respond};
pub use config::{ConfigError, Settings};
pub use engine::{ChatSession, HyperParameters, SessionOptions};
pub use error::SessionError;
pub use registry::EmbeddingModel;
pub use retriever::VectorRetriever;
pub use workflow::{GraphBuilder, ModelGraph, NodeContext, RetrievalGraph};
