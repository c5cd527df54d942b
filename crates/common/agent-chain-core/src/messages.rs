//! Message types for LLM conversations.
//!
//! `AnyMessage` is a tagged union over the three roles a conversation
//! carries. Content is either plain text or an ordered list of parts.

mod ai;
mod base;
mod content;
mod human;
mod system;

pub use ai::AIMessage;
pub use base::{AnyMessage, HasId, MessageRole};
pub use content::{ContentPart, MessageContent};
pub use human::HumanMessage;
pub use system::SystemMessage;
