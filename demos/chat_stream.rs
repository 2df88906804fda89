//! Stream a chat completion and print the deltas as they arrive.
//!
//! Run with:
//! ```bash
//! export OPENAI_API_KEY="your-api-key"
//! RUST_LOG=sseread=debug cargo run --example chat_stream
//! ```

use std::io::Write;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use sseread::{open_stream, HttpTransport, StreamOptions, StreamRequest, TransportOptions};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct ChatChunk {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let api_key =
        std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY environment variable must be set");

    let transport = HttpTransport::new(
        TransportOptions::default()
            .with_connect_timeout(Duration::from_secs(10))
            .with_timeout(Duration::from_secs(300)),
    )?;

    let request = StreamRequest::post_json(
        "https://api.openai.com/v1/chat/completions",
        &serde_json::json!({
            "model": "gpt-4o-mini",
            "stream": true,
            "messages": [{"role": "user", "content": "Write a haiku about Rust programming."}],
        }),
    )?
    .with_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {api_key}"))?,
    );

    let options = StreamOptions::default().with_read_timeout(Duration::from_secs(60));
    let reader = open_stream::<ChatChunk, _>(&transport, request, options).await?;

    let stream = reader.into_stream();
    futures::pin_mut!(stream);

    while let Some(chunk) = stream.next().await {
        for choice in chunk?.choices {
            if let Some(content) = choice.delta.content {
                print!("{content}");
                std::io::stdout().flush()?;
            }
        }
    }
    println!();

    Ok(())
}
