use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

use crate::{Error, Result};
use crate::embeddings::Embeddings;

/// Deterministic fake embedding model for unit testing purposes.
///
/// This embedding model creates embeddings by sampling from a normal distribution
/// with a seed based on the hash of the text, so equal texts embed equally.
///
/// Do not use this outside of testing, as it is not a real embedding model.
#[derive(Debug)]
pub struct DeterministicFakeEmbedding {
    /// The size of the embedding vector.
    pub size: usize,
    calls: AtomicUsize,
    failure: Option<String>,
}

impl DeterministicFakeEmbedding {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            calls: AtomicUsize::new(0),
            failure: None,
        }
    }

    /// An embedding model whose every call fails with `message`.
    pub fn failing(size: usize, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(size)
        }
    }

    fn record_call(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(Error::other(message.clone())),
            None => Ok(()),
        }
    }

    /// Number of embed calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn get_seed(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish() % 100_000_000
    }

    fn get_embedding(&self, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..self.size)
            .map(|_| StandardNormal.sample(&mut rng))
            .collect()
    }
}

#[async_trait]
impl Embeddings for DeterministicFakeEmbedding {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.record_call()?;
        Ok(texts
            .iter()
            .map(|text| self.get_embedding(Self::get_seed(text)))
            .collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.record_call()?;
        Ok(self.get_embedding(Self::get_seed(text)))
    }
}
