//! Shared streaming plumbing for the Planner/Judge/Responder model calls
//! (spec §4.1 "Must emit streaming scope markers").

use axon_core::{CustomEvent, EventSink, Scope, StreamEvent};
use axon_turn::{ChatModel, DeltaScope, ProviderRequest};
use futures::StreamExt;

/// Stream one model call under `scope`, emitting reset/delta events to
/// `sink` as they arrive, and return the concatenated (content, reasoning)
/// text. Emission failures are logged and otherwise ignored — per spec §5,
/// a failed emit must never abort the turn.
pub async fn stream_scope(
    model: &dyn ChatModel,
    request: ProviderRequest,
    scope: Scope,
    sink: &dyn EventSink,
) -> Result<(String, String), axon_turn::ProviderError> {
    emit_ignore(sink, StreamEvent::Custom(CustomEvent::ReasoningReset { scope })).await;
    emit_ignore(sink, StreamEvent::Custom(CustomEvent::ContentReset { scope })).await;

    let mut stream = model.stream(request).await?;
    let mut content = String::new();
    let mut reasoning = String::new();

    while let Some(delta) = stream.next().await {
        let delta = delta?;
        match delta.scope {
            DeltaScope::Content => {
                content.push_str(&delta.text);
                emit_ignore(
                    sink,
                    StreamEvent::Custom(CustomEvent::ContentDelta {
                        scope,
                        delta: delta.text,
                    }),
                )
                .await;
            }
            DeltaScope::Reasoning => {
                reasoning.push_str(&delta.text);
                emit_ignore(
                    sink,
                    StreamEvent::Custom(CustomEvent::ReasoningDelta {
                        scope,
                        delta: delta.text,
                    }),
                )
                .await;
            }
        }
    }

    Ok((content, reasoning))
}

async fn emit_ignore(sink: &dyn EventSink, event: StreamEvent) {
    if let Err(err) = sink.emit(event).await {
        tracing::warn!(error = %err, "stream emit failed, continuing");
    }
}
