//! The one-way channel to the host.

use hostbridge_common::BridgeError;
use tokio::sync::mpsc;

/// Fire-and-forget message channel to the host.
///
/// Implementations must not block waiting for a reply; replies come back
/// through [`CallCorrelator::deliver`](crate::CallCorrelator::deliver).
pub trait Transport: Send + Sync {
    fn post_message(&self, message: &str) -> Result<(), BridgeError>;
}

/// In-process transport backed by an unbounded tokio channel. The receiving
/// half belongs to whatever plays the host.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn post_message(&self, message: &str) -> Result<(), BridgeError> {
        self.tx
            .send(message.to_string())
            .map_err(|_| BridgeError::Transport("host channel closed".into()))
    }
}
