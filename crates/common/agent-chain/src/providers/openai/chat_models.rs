mod base;

pub use base::ChatOpenAI;
