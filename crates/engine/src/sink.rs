use crate::{EngineError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use watchword_protocol::SinkEvent;

/// Fire-and-forget notification boundary to the external sink process.
/// Delivery is best effort; the engine never retries and never surfaces a
/// sink failure beyond diagnostics.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn notify(&self, event: SinkEvent) -> Result<()>;
}

/// Discards every notification. For runs where no sink process exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl Sink for NullSink {
    async fn notify(&self, _event: SinkEvent) -> Result<()> {
        Ok(())
    }
}

/// Sink backed by an unbounded channel; the receiving half is drained by
/// whoever plays the sink-process role (the console loop, or a test).
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Sink for ChannelSink {
    async fn notify(&self, event: SinkEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|err| EngineError::Sink(format!("sink receiver gone: {err}")))
    }
}
