//! Checkpoint savers shipped with the graph runtime.

pub mod memory;

pub use memory::InMemorySaver;
