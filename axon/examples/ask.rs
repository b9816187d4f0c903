//! Run a single Q&A turn against the in-memory reference adapters and
//! print every streamed event as it arrives.
//!
//! ```text
//! AXON_FAST_PROVIDER=ollama AXON_REASONING_PROVIDER=ollama \
//!     cargo run --example ask -- "What is a knowledge graph?"
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axon::config::Config;
use axon::Engine;
use axon_core::id::SessionId;
use axon_core::stream::{EventSink, StreamEvent};

struct StdoutSink;

#[async_trait]
impl EventSink for StdoutSink {
    async fn emit(&self, event: StreamEvent) -> Result<(), std::io::Error> {
        println!("{}", serde_json::to_string(&event).unwrap_or_default());
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let question = std::env::args().nth(1).unwrap_or_else(|| "What is a knowledge graph?".to_string());

    let engine = Engine::new(Config::from_env()).expect("build engine");
    let sink: Arc<dyn EventSink> = Arc::new(StdoutSink);
    let session = SessionId::new("example-session");

    let turn = engine.ask(sink, &session, &question, "").await.expect("turn failed");

    println!("---");
    println!("{}", turn.final_answer.unwrap_or_else(|| "(no final answer)".to_string()));
}
