//! OpenAI-compatible provider tests against a mock HTTP server.

mod test_chat_models;
mod test_embeddings;
