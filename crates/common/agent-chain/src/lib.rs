//! Agent Chain - provider integrations for agent-chain-core.
//!
//! # Provider Support
//!
//! | Provider | Types | Environment Variable |
//! |----------|-------|---------------------|
//! | OpenAI-compatible (OpenAI, Ollama, vLLM) | `ChatOpenAI`, `OpenAIEmbeddings` | `OPENAI_API_KEY` |
//! | Local ONNX Runtime | `OnnxEmbeddings` | `ORT_DYLIB_PATH` |
//!
//! # Quick Start
//!
//! ```ignore
//! use agent_chain::ChatOpenAI;
//! use agent_chain_core::{ChatModel, GenerationParams, HumanMessage};
//!
//! let model = ChatOpenAI::new("llama3.2")
//!     .api_base("http://localhost:11434/v1")
//!     .api_key("ollama");
//! let reply = model
//!     .invoke(&[HumanMessage::new("Hello!").into()], &GenerationParams::default())
//!     .await?;
//! ```
//!
//! # Feature Flags
//!
//! - `openai` (default): OpenAI-compatible chat completions and embeddings
//! - `onnx` (default): in-process sentence-transformer embeddings

pub mod providers;

pub use agent_chain_core::{Error, Result};

#[cfg(feature = "openai")]
pub use providers::openai::{ChatOpenAI, OpenAIEmbeddings};

#[cfg(feature = "onnx")]
pub use providers::onnx::{Device, OnnxEmbeddings, Pooling};
