//! In-process channel link

use crate::error::{KnxError, KnxResult};
use crate::link::Link;
use async_trait::async_trait;
use knx_cemi::LData;
use tokio::sync::mpsc;

/// Link delivering outgoing requests into an in-process channel
///
/// The receiving half plays the part of the tunnelling gateway. Useful
/// for wiring the engine against a gateway emulator or a test harness.
#[derive(Debug, Clone)]
pub struct ChannelLink {
    tx: mpsc::Sender<LData>,
}

impl ChannelLink {
    /// Create a link sending into an existing channel
    pub fn new(tx: mpsc::Sender<LData>) -> Self {
        Self { tx }
    }

    /// Create a link together with the gateway-side receiver
    ///
    /// # Arguments
    ///
    /// * `capacity` - Buffer size of the underlying channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<LData>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Link for ChannelLink {
    async fn send(&self, frame: LData) -> KnxResult<()> {
        self.tx.send(frame).await.map_err(|_| KnxError::LinkClosed)
    }
}
