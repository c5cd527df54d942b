mod base;
pub mod fake;

pub use base::Embeddings;
pub use fake::DeterministicFakeEmbedding;
