//! Session settings resolved from the environment.
//!
//! Every key is optional and falls back to a local-development default.
//! Values are resolved once into an immutable [`Settings`] that is passed
//! by reference to whatever needs it.

use std::path::PathBuf;

use agent_chain::Device;
use secrecy::SecretString;
use thiserror::Error;

pub const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-small-en-v1.5";
pub const DEFAULT_EMBEDDING_MODEL_DIR: &str = "./models";
pub const DEFAULT_LLM_MODEL: &str = "llama3.2";
pub const DEFAULT_LLM_MODEL_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_LLM_API_KEY: &str = "ollama";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_VECTOR_STORE_DIR: &str = "./chromadb";
pub const DEFAULT_COLLECTION: &str = "babylon_vectors";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// `EMBEDDING_MODEL`
    pub embedding_model: String,
    /// `EMBEDDING_DEVICE`: where the local embedding model runs.
    pub embedding_device: Device,
    /// `EMBEDDING_MODEL_DIR`: holds `<model id>/model.onnx` and
    /// `<model id>/tokenizer.json`.
    pub embedding_model_dir: PathBuf,
    /// `EMBEDDINGS_URL`: an OpenAI-compatible embeddings API serving the
    /// embedding model. When set it replaces the local model and the device
    /// is unused.
    pub embeddings_url: Option<String>,
    /// `LLM_MODEL`
    pub llm_model: String,
    /// `LLM_MODEL_URL`; empty means the provider's public endpoint.
    pub llm_model_url: Option<String>,
    /// `LLM_API_KEY`
    pub llm_api_key: SecretString,
    /// `LLM_TEMPERATURE`
    pub temperature: f64,
    /// `VECTOR_TOP_K`
    pub top_k: usize,
    /// `CHROMA_SQLITE_DIR`
    pub vector_store_dir: PathBuf,
    /// `EMBEDDINGS_COLLECTION_CHROMA`
    pub collection: String,
    /// `LLM_TIMEOUT_SECONDS`, applied to every outbound HTTP call.
    pub request_timeout_secs: u64,
    /// `CHAT_USE_RETRIEVAL`: add retrieved context before the model runs.
    pub use_retrieval: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_device: Device::Cpu,
            embedding_model_dir: PathBuf::from(DEFAULT_EMBEDDING_MODEL_DIR),
            embeddings_url: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_model_url: Some(DEFAULT_LLM_MODEL_URL.to_string()),
            llm_api_key: SecretString::from(DEFAULT_LLM_API_KEY),
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            vector_store_dir: PathBuf::from(DEFAULT_VECTOR_STORE_DIR),
            collection: DEFAULT_COLLECTION.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECONDS,
            use_retrieval: false,
        }
    }
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        let url = |key: &str, default: Option<String>| match lookup(key) {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url),
            None => default,
        };

        Ok(Self {
            embedding_model: string("EMBEDDING_MODEL", defaults.embedding_model),
            embedding_device: optional(
                &lookup,
                "EMBEDDING_DEVICE",
                defaults.embedding_device,
                to_device,
            )?,
            embedding_model_dir: lookup("EMBEDDING_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.embedding_model_dir),
            embeddings_url: url("EMBEDDINGS_URL", defaults.embeddings_url),
            llm_model: string("LLM_MODEL", defaults.llm_model),
            llm_model_url: url("LLM_MODEL_URL", defaults.llm_model_url),
            llm_api_key: lookup("LLM_API_KEY")
                .map(SecretString::from)
                .unwrap_or(defaults.llm_api_key),
            temperature: optional(&lookup, "LLM_TEMPERATURE", defaults.temperature, to_float)?,
            top_k: optional(&lookup, "VECTOR_TOP_K", defaults.top_k, to_int)?,
            vector_store_dir: lookup("CHROMA_SQLITE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.vector_store_dir),
            collection: string("EMBEDDINGS_COLLECTION_CHROMA", defaults.collection),
            request_timeout_secs: optional(
                &lookup,
                "LLM_TIMEOUT_SECONDS",
                defaults.request_timeout_secs,
                to_int,
            )?,
            use_retrieval: optional(&lookup, "CHAT_USE_RETRIEVAL", defaults.use_retrieval, to_bool)?,
        })
    }
}

fn optional<F, T>(
    lookup: &F,
    key: &'static str,
    default: T,
    convert: fn(&'static str, &str) -> Result<T, ConfigError>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => convert(key, raw.trim()),
        None => Ok(default),
    }
}

pub fn to_int<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, raw, e.to_string()))
}

pub fn to_float(key: &'static str, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = raw
        .parse()
        .map_err(|e: std::num::ParseFloatError| ConfigError::invalid(key, raw, e.to_string()))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::invalid(key, raw, "must be a finite number"))
    }
}

pub fn to_device(key: &'static str, raw: &str) -> Result<Device, ConfigError> {
    raw.parse()
        .map_err(|e: agent_chain::Error| ConfigError::invalid(key, raw, e.to_string()))
}

pub fn to_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw, "expected a boolean")),
    }
}
