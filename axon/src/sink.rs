//! A channel-backed [`EventSink`] (spec §6 "(ambient) HTTP/SSE transport"):
//! the orchestrator emits into an unbounded `mpsc` channel, and the HTTP
//! layer drains the receiving half into an SSE body. Emission is
//! best-effort per the trait's contract — a closed receiver (the client
//! disconnected) is logged, not propagated.

use async_trait::async_trait;
use axon_core::stream::StreamEvent;
use tokio::sync::mpsc::UnboundedSender;

/// Forwards every emitted [`StreamEvent`] onto an unbounded channel.
pub struct ChannelSink {
    tx: UnboundedSender<StreamEvent>,
}

impl ChannelSink {
    /// Wrap the sending half of a channel as an [`EventSink`].
    pub fn new(tx: UnboundedSender<StreamEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl axon_core::stream::EventSink for ChannelSink {
    async fn emit(&self, event: StreamEvent) -> Result<(), std::io::Error> {
        self.tx
            .send(event)
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "event receiver dropped"))
    }
}
