//! Agent Chain Core - the shared building blocks of the chat session stack.
//!
//! This crate provides:
//! - Message types for LLM conversations (human, AI, system)
//! - Documents and the `Embeddings` abstraction
//! - A SQLite-backed vector store with cosine-distance search
//! - The `ChatModel` trait that providers implement
//! - Deterministic fakes for embeddings and chat models
//!
//! # Architecture
//!
//! - **Message layer** ([`messages`]): `AnyMessage` and its variants
//! - **Model layer** ([`language_models`]): `ChatModel` and `GenerationParams`
//! - **Retrieval layer** ([`embeddings`], [`vectorstores`], [`documents`])

pub mod documents;
pub mod embeddings;
pub mod error;
pub mod language_models;
pub mod messages;
pub mod vectorstores;

pub use documents::Document;
pub use embeddings::{DeterministicFakeEmbedding, Embeddings};
pub use error::{Error, Result};
pub use language_models::{ChatModel, FakeListChatModel, GenerationParams};
pub use messages::{
    AIMessage, AnyMessage, ContentPart, HasId, HumanMessage, MessageContent, MessageRole,
    SystemMessage,
};
pub use vectorstores::{SqliteVectorStore, VectorStore};
