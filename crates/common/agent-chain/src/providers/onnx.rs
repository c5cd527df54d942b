//! Sentence-transformer embeddings computed in process with ONNX Runtime.
//!
//! A model directory holds `model.onnx` and `tokenizer.json`, as exported
//! for Hugging Face sentence-transformer models. The ONNX Runtime shared
//! library is loaded at run time (see `ORT_DYLIB_PATH`).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use agent_chain_core::embeddings::Embeddings;
use async_trait::async_trait;
use ort::execution_providers::{CUDAExecutionProvider, CoreMLExecutionProvider};
use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::{Tokenizer, TruncationParams};

use crate::{Error, Result};

/// Longest input, in tokens, that BERT-style encoders accept.
const MAX_TOKENS: usize = 512;

/// Where inference runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    /// CUDA device ordinal.
    Cuda(i32),
    /// Apple CoreML (`mps` is accepted as an alias).
    CoreMl,
}

impl FromStr for Device {
    type Err = Error;

    /// `cpu`, `cuda`, `cuda:<ordinal>`, `mps` or `coreml`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda(0)),
            "mps" | "coreml" => Ok(Self::CoreMl),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse().ok())
                .map(Self::Cuda)
                .ok_or_else(|| Error::invalid_config(format!("unknown device '{other}'"))),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
            Self::CoreMl => f.write_str("coreml"),
        }
    }
}

/// How token embeddings collapse into one sentence vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pooling {
    /// The first (`[CLS]`) token, as BGE models are trained.
    #[default]
    Cls,
    /// Attention-masked mean over all tokens.
    Mean,
}

#[derive(Clone)]
struct Encoder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    token_type_ids: bool,
    pooling: Pooling,
    normalize: bool,
}

/// Local ONNX embedding model.
///
/// ```ignore
/// let embeddings = OnnxEmbeddings::from_directory("models/BAAI/bge-small-en-v1.5", Device::Cpu)?
///     .pooling(Pooling::Cls)
///     .normalize(true);
/// let vector = embeddings.embed_query("hello").await?;
/// ```
#[derive(Clone)]
pub struct OnnxEmbeddings {
    model_dir: PathBuf,
    device: Device,
    encoder: Encoder,
}

impl fmt::Debug for OnnxEmbeddings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxEmbeddings")
            .field("model_dir", &self.model_dir)
            .field("device", &self.device)
            .field("pooling", &self.encoder.pooling)
            .field("normalize", &self.encoder.normalize)
            .finish_non_exhaustive()
    }
}

fn ort_error<E: fmt::Display>(context: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::other(format!("{context}: {e}"))
}

impl OnnxEmbeddings {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir` onto `device`.
    ///
    /// An accelerator that is not available at run time falls back to CPU.
    pub fn from_directory(model_dir: impl AsRef<Path>, device: Device) -> Result<Self> {
        let model_dir = model_dir.as_ref().to_path_buf();
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        for path in [&model_path, &tokenizer_path] {
            if !path.is_file() {
                return Err(Error::missing_config(format!(
                    "embedding model file {}",
                    path.display()
                )));
            }
        }

        let builder = Session::builder().map_err(ort_error("ONNX session builder"))?;
        let builder = match device {
            Device::Cpu => builder,
            Device::Cuda(ordinal) => builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(ordinal)
                    .build()])
                .map_err(ort_error("ONNX CUDA provider"))?,
            Device::CoreMl => builder
                .with_execution_providers([CoreMLExecutionProvider::default().build()])
                .map_err(ort_error("ONNX CoreML provider"))?,
        };
        let session = builder
            .commit_from_file(&model_path)
            .map_err(ort_error("ONNX load model"))?;
        let token_type_ids = session.inputs().len() > 2;

        let mut tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(ort_error("Failed to load tokenizer"))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(ort_error("Failed to configure truncation"))?;

        tracing::info!(
            model = %model_dir.display(),
            device = %device,
            "Loaded ONNX embedding model"
        );

        Ok(Self {
            model_dir,
            device,
            encoder: Encoder {
                session: Arc::new(Mutex::new(session)),
                tokenizer: Arc::new(tokenizer),
                token_type_ids,
                pooling: Pooling::default(),
                normalize: true,
            },
        })
    }

    /// [`Self::from_directory`] on the blocking thread pool.
    pub async fn load(model_dir: impl Into<PathBuf>, device: Device) -> Result<Self> {
        let model_dir = model_dir.into();
        tokio::task::spawn_blocking(move || Self::from_directory(model_dir, device))
            .await
            .map_err(ort_error("Model load task failed"))?
    }

    pub fn pooling(mut self, pooling: Pooling) -> Self {
        self.encoder.pooling = pooling;
        self
    }

    /// L2-normalize every vector (on by default).
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.encoder.normalize = normalize;
        self
    }

    pub fn device(&self) -> Device {
        self.device
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let encoder = self.encoder.clone();
        tokio::task::spawn_blocking(move || {
            texts
                .iter()
                .map(|text| encoder.embed(text))
                .collect::<Result<Vec<_>>>()
        })
        .await
        .map_err(ort_error("Embedding task failed"))?
    }
}

impl Encoder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(ort_error("Tokenization failed"))?;

        let seq_len = encoding.get_ids().len();
        let to_i64 = |values: &[u32]| values.iter().map(|&v| i64::from(v)).collect::<Vec<_>>();
        let attention_mask = to_i64(encoding.get_attention_mask());

        let ids = ndarray::Array2::from_shape_vec((1, seq_len), to_i64(encoding.get_ids()))
            .map_err(ort_error("input_ids array"))?;
        let mask = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone())
            .map_err(ort_error("attention_mask array"))?;
        let types = ndarray::Array2::from_shape_vec((1, seq_len), to_i64(encoding.get_type_ids()))
            .map_err(ort_error("token_type_ids array"))?;

        let ids = TensorRef::from_array_view(&ids).map_err(ort_error("input_ids tensor"))?;
        let mask = TensorRef::from_array_view(&mask).map_err(ort_error("attention_mask tensor"))?;
        let types =
            TensorRef::from_array_view(&types).map_err(ort_error("token_type_ids tensor"))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| Error::other(format!("ONNX session lock poisoned: {e}")))?;
        let outputs = if self.token_type_ids {
            session.run(ort::inputs![ids, mask, types])
        } else {
            session.run(ort::inputs![ids, mask])
        }
        .map_err(ort_error("ONNX inference failed"))?;

        // [1, seq_len, hidden]
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(ort_error("Extract embeddings"))?;
        let hidden = match shape.iter().copied().collect::<Vec<i64>>().as_slice() {
            [_, _, hidden] if *hidden > 0 => *hidden as usize,
            dims => {
                return Err(Error::other(format!("unexpected output shape {dims:?}")));
            }
        };

        let mut pooled = pool(data, hidden, &attention_mask, self.pooling);
        if self.normalize {
            l2_normalize(&mut pooled);
        }
        Ok(pooled)
    }
}

/// Collapse row-major `[seq_len, hidden]` token vectors into one vector.
fn pool(tokens: &[f32], hidden: usize, attention_mask: &[i64], pooling: Pooling) -> Vec<f32> {
    match pooling {
        Pooling::Cls => tokens.iter().take(hidden).copied().collect(),
        Pooling::Mean => {
            let mut sum = vec![0.0f32; hidden];
            let mut count = 0.0f32;
            for (row, &mask) in tokens.chunks_exact(hidden).zip(attention_mask) {
                if mask > 0 {
                    for (acc, value) in sum.iter_mut().zip(row) {
                        *acc += value;
                    }
                    count += 1.0;
                }
            }
            if count > 0.0 {
                for value in &mut sum {
                    *value /= count;
                }
            }
            sum
        }
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector {
            *value /= norm;
        }
    }
}

#[async_trait]
impl Embeddings for OnnxEmbeddings {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.run(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.run(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::other("embedding model returned no vector"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!(" CUDA ".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:1".parse::<Device>().unwrap(), Device::Cuda(1));
        assert_eq!("mps".parse::<Device>().unwrap(), Device::CoreMl);
        assert!("tpu".parse::<Device>().unwrap_err().is_invalid_config());
        assert!("cuda:x".parse::<Device>().is_err());
        assert_eq!(Device::Cuda(2).to_string(), "cuda:2");
    }

    #[test]
    fn test_cls_pooling_takes_first_token() {
        let tokens = [1.0, 2.0, 10.0, 20.0];
        assert_eq!(pool(&tokens, 2, &[1, 1], Pooling::Cls), vec![1.0, 2.0]);
    }

    #[test]
    fn test_mean_pooling_skips_masked_tokens() {
        let tokens = [1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
        assert_eq!(pool(&tokens, 2, &[1, 1, 0], Pooling::Mean), vec![2.0, 3.0]);
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.6, 0.8]);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_missing_model_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxEmbeddings::from_directory(dir.path(), Device::Cpu).unwrap_err();
        assert!(err.is_invalid_config());
        assert!(err.to_string().contains("model.onnx"));
    }

    #[tokio::test]
    async fn test_load_reports_missing_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.onnx"), b"").unwrap();
        let err = OnnxEmbeddings::load(dir.path(), Device::Cpu).await.unwrap_err();
        assert!(err.to_string().contains("tokenizer.json"));
    }
}
