mod base;
pub mod fake_chat_models;

pub use base::{ChatModel, GenerationParams};
pub use fake_chat_models::FakeListChatModel;
