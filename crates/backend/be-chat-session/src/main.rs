use std::collections::HashMap;
use std::sync::Arc;

use agent_chain_core::Document;
use be_chat_session::{
    ChatResponse, ChatSession, GraphBuilder, ModelGraph, RetrievalGraph, SessionOptions, Settings,
    respond,
};
use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, PartialEq)]
enum Command<'a> {
    Chat(&'a str),
    Ingest(&'a str),
    Search(&'a str),
    History,
    Quit,
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match head {
            ":ingest" if !rest.is_empty() => Self::Ingest(rest),
            ":search" if !rest.is_empty() => Self::Search(rest),
            ":history" => Self::History,
            ":quit" | ":q" => Self::Quit,
            _ => Self::Chat(line),
        }
    }
}

/// One document per blank-line separated paragraph.
fn split_paragraphs(text: &str, source: &str) -> Vec<Document> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(index, paragraph)| {
            let metadata = HashMap::from([
                ("source".to_string(), serde_json::Value::from(source)),
                ("paragraph".to_string(), serde_json::Value::from(index)),
            ]);
            Document::builder()
                .page_content(paragraph)
                .metadata(metadata)
                .build()
        })
        .collect()
}

async fn run_command(
    session: &ChatSession,
    command: Command<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match command {
        Command::Chat(text) => match respond(session, text).await {
            ChatResponse::Success { text, .. } => println!("{text}"),
            ChatResponse::Failure { message } => eprintln!("{message}"),
        },
        Command::Ingest(path) => {
            let text = tokio::fs::read_to_string(path).await?;
            let documents = split_paragraphs(&text, path);
            let ids = session.retriever().add_documents(documents).await?;
            println!("ingested {} passages from {path}", ids.len());
        }
        Command::Search(query) => {
            let k = session.hyper_parameters().top_k;
            for (document, distance) in session.retriever().similarity_search(query, k).await? {
                println!("{distance:.4}  {}", document.page_content);
            }
        }
        Command::History => {
            for message in session.history().await? {
                println!("{}: {}", message.role(), message.content());
            }
        }
        Command::Quit => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();

    // --- Tracing ---
    let app_level = if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let global_filter = Targets::new()
        .with_default(LevelFilter::WARN)
        .with_target("be_", app_level)
        .with_target("agent_chain", app_level)
        .with_target("agent_graph", app_level)
        .with_target("hyper", LevelFilter::OFF)
        .with_target("reqwest", LevelFilter::OFF);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(global_filter)
        .try_init()?;

    // --- Session ---
    let settings = Settings::from_env()?;
    let graph_builder: Arc<dyn GraphBuilder> = if settings.use_retrieval {
        Arc::new(RetrievalGraph)
    } else {
        Arc::new(ModelGraph)
    };
    let options = SessionOptions::builder()
        .embedding_model(settings.embedding_model.clone())
        .llm_model(settings.llm_model.clone())
        .maybe_model_url(settings.llm_model_url.clone())
        .maybe_thread_id(std::env::args().nth(1))
        .graph_builder(graph_builder)
        .build();
    let session = ChatSession::new(&settings, options).await?;
    eprintln!("thread {}", session.thread_id());

    // --- Chat loop ---
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received CTRL+C, shutting down...");
                break;
            }
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = Command::parse(line);
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run_command(&session, command).await {
            eprintln!("error: {e}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("hello there"), Command::Chat("hello there"));
        assert_eq!(Command::parse(":ingest notes.txt"), Command::Ingest("notes.txt"));
        assert_eq!(Command::parse(":search  babylon "), Command::Search("babylon"));
        assert_eq!(Command::parse(":history"), Command::History);
        assert_eq!(Command::parse(":q"), Command::Quit);
        assert_eq!(Command::parse(":ingest"), Command::Chat(":ingest"));
    }

    #[test]
    fn test_split_paragraphs() {
        let docs = split_paragraphs("first\nline\n\n\n  second  \n\n", "notes.txt");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].page_content, "first\nline");
        assert_eq!(docs[1].page_content, "second");
        assert_eq!(docs[1].metadata["source"], "notes.txt");
        assert_eq!(docs[1].metadata["paragraph"], 1);
    }
}
