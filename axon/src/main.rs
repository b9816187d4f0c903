//! Minimal `axum` SSE server exposing one turn per request (spec §6
//! "(ambient) HTTP/SSE transport"): `POST /sessions/:id/ask` drives
//! [`Engine::ask`] and streams every [`StreamEvent`] it emits back as a
//! Server-Sent Event, matching the event/data framing `StreamEvent`
//! already serializes to (`#[serde(tag = "event", content = "data")]`).
//!
//! Structured logging follows the teacher's `tracing`/`tracing-subscriber`
//! setup rather than inventing a bespoke logger.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use axon::config::Config;
use axon::sink::ChannelSink;
use axon::Engine;
use axon_core::id::SessionId;

#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    user_profile: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let engine = match Engine::new(config) {
        Ok(engine) => Arc::new(engine),
        Err(err) => {
            tracing::error!(error = %err, "failed to build orchestration engine");
            std::process::exit(1);
        }
    };

    let app = Router::new()
        .route("/sessions/:id/ask", post(ask_handler))
        .with_state(AppState { engine });

    let addr = std::env::var("AXON_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    tracing::info!(%addr, "axon listening");
    let listener = tokio::net::TcpListener::bind(&addr).await.expect("bind listen address");
    axum::serve(listener, app).await.expect("serve");
}

async fn ask_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<AskRequest>,
) -> impl IntoResponse {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let sink: Arc<dyn axon_core::stream::EventSink> = Arc::new(ChannelSink::new(tx));
    let engine = Arc::clone(&state.engine);
    let session = SessionId::new(session_id);

    tokio::spawn(async move {
        if let Err(err) = engine.ask(Arc::clone(&sink), &session, &request.question, &request.user_profile).await {
            tracing::warn!(error = %err, session_id = %session.as_str(), "turn failed");
            let _ = sink.emit(axon_core::stream::StreamEvent::Error { detail: err.to_string() }).await;
        }
    });

    let stream = UnboundedReceiverStream::new(rx).map(to_sse_event);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse_event(event: axon_core::stream::StreamEvent) -> Result<Event, Infallible> {
    let wire = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
    let name = wire.get("event").and_then(|v| v.as_str()).unwrap_or("message").to_string();
    let data = wire.get("data").cloned().unwrap_or(serde_json::Value::Null);
    let payload = serde_json::to_string(&data).unwrap_or_default();
    Ok(Event::default().event(name).data(payload))
}
