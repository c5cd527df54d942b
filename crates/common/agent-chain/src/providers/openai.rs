//! OpenAI-compatible provider.
//!
//! Works against api.openai.com and any server exposing the same REST
//! surface, such as Ollama's `/v1` endpoint.

mod chat_models;
mod embeddings;

pub use chat_models::ChatOpenAI;
pub use embeddings::OpenAIEmbeddings;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

fn build_client(timeout: Option<u64>) -> crate::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(std::time::Duration::from_secs(timeout));
    }
    builder
        .build()
        .map_err(|e| crate::Error::other(format!("Failed to build HTTP client: {e}")))
}

async fn error_for_status(response: reqwest::Response) -> crate::Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
    Err(crate::Error::api(status, error_text))
}
