//! Link trait for frame submission

use crate::error::KnxResult;
use async_trait::async_trait;
use knx_cemi::LData;

/// Interface to a tunnelling link able to transmit L_Data requests
///
/// Implementations wrap whatever actually carries the traffic. The
/// transport layer only needs a way to hand over one outgoing request
/// at a time; inbound traffic travels separately as a stream of
/// [`Frame`](knx_cemi::Frame) values.
#[async_trait]
pub trait Link: Send + Sync {
    /// Submit one L_Data request for transmission
    ///
    /// # Arguments
    ///
    /// * `frame` - Payload of the L_Data.req to transmit
    async fn send(&self, frame: LData) -> KnxResult<()>;
}
