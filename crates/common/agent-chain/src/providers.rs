//! Provider implementations for different LLM services.
//!
//! Each provider is implemented in its own submodule.

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "onnx")]
pub mod onnx;
