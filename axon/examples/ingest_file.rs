//! Ingest a single text file into the in-memory vector/graph stores and
//! print the resulting summary.
//!
//! ```text
//! AXON_FAST_PROVIDER=ollama AXON_REASONING_PROVIDER=ollama \
//!     cargo run --example ingest_file -- notes.txt
//! ```

use axon::config::Config;
use axon::wiring::{build_chat_model, build_in_memory_stores};
use axon_ingest::pipeline::{ingest_document, IngestConfig, IngestModels};

#[tokio::main]
async fn main() {
    let path = std::env::args().nth(1).expect("usage: ingest_file <path>");
    let text = std::fs::read_to_string(&path).expect("read input file");

    let config = Config::from_env();
    let extractor = build_chat_model(&config.fast_model).expect("build extractor model");
    let dedup = build_chat_model(&config.reasoning_model).expect("build dedup model");
    let (vector_store, graph_store) = build_in_memory_stores();

    let ingest_config = IngestConfig { chunk_size: config.chunk_size, chunk_overlap: config.chunk_overlap, llm_concurrency: config.llm_concurrency, file_concurrency: config.file_concurrency };
    let models = IngestModels { extractor, dedup };

    let summary = ingest_document(&text, &path, &ingest_config, &models, vector_store.as_ref(), graph_store.as_ref())
        .await
        .expect("ingestion failed");

    println!("chunks: {}", summary.chunks);
    println!("entities: {}", summary.entities);
    println!("relations: {}", summary.relations);
}
