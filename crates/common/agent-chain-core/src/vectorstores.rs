mod base;
pub mod sqlite;
pub mod utils;

pub use base::VectorStore;
pub use sqlite::SqliteVectorStore;
pub use utils::{cosine_distance, cosine_similarity};
