//! Base interfaces for agent-graph checkpoint savers.
//!
//! A checkpoint is the latest state snapshot of one thread. Savers store
//! it serialized, so a snapshot handed out by `get` can never alias the
//! stored copy.

mod base;
mod error;
pub mod codec;

pub use base::{Checkpoint, CheckpointSaver};
pub use error::{CheckpointError, Result};
