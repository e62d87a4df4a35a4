//! Scriptable far side of a tunnelling link

use bytes::Bytes;
use knx_cemi::{
    Apci, Apdu, ControlCommand, ControlInfo, Destination, Frame, LData, SEQUENCE_MODULUS, Tpdu,
};
use knx_core::IndividualAddr;
use knx_link::ChannelLink;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Simulated device behind the gateway
struct SimDevice {
    /// Descriptor data returned on a descriptor read
    descriptor: Bytes,
    /// Sequence number for the device's next numbered TPDU
    seq: u8,
}

/// Gateway emulator answering on the far side of a channel link
///
/// Consumes the L_Data requests a [`ChannelLink`] transmits and plays
/// the bus side of the protocol: requests to a registered device are
/// confirmed cleanly, a numbered descriptor read gets a transport ack
/// followed by the numbered response, and requests to devices nobody
/// registered come back with an error-flagged confirmation. Group
/// telegrams are confirmed and logged.
pub struct SimGateway {
    requests: mpsc::Receiver<LData>,
    frames: mpsc::Sender<Frame>,
    devices: HashMap<IndividualAddr, SimDevice>,
}

impl SimGateway {
    /// Create a gateway over the two halves of a link
    ///
    /// # Arguments
    ///
    /// * `requests` - Requests transmitted by the engine's link
    /// * `frames` - Channel feeding the engine's inbound dispatch
    pub fn new(requests: mpsc::Receiver<LData>, frames: mpsc::Sender<Frame>) -> Self {
        Self {
            requests,
            frames,
            devices: HashMap::new(),
        }
    }

    /// Register a device the gateway answers for
    ///
    /// # Arguments
    ///
    /// * `addr` - Individual address of the device
    /// * `descriptor` - Descriptor data it reports
    pub fn with_device(mut self, addr: IndividualAddr, descriptor: Bytes) -> Self {
        self.devices.insert(
            addr,
            SimDevice {
                descriptor,
                seq: 0,
            },
        );
        self
    }

    /// Run the gateway on its own task
    ///
    /// The task ends once the request channel closes.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            match request.destination {
                Destination::Device(addr) => self.answer_device_request(addr, request).await,
                Destination::Group(group) => {
                    log::debug!("group telegram to {} confirmed", group);
                    self.confirm(request, false).await;
                }
            }
        }
        log::debug!("request channel ended, gateway done");
    }

    async fn answer_device_request(&mut self, addr: IndividualAddr, request: LData) {
        if !self.devices.contains_key(&addr) {
            // Nothing on the bus acknowledged the telegram
            self.confirm(request, true).await;
            return;
        }

        self.confirm(request.clone(), false).await;
        match &request.tpdu {
            Tpdu::Control(ctrl) => match ctrl.command {
                ControlCommand::Connect => {
                    if let Some(device) = self.devices.get_mut(&addr) {
                        device.seq = 0;
                    }
                    log::debug!("{}: transport connection opened", addr);
                }
                ControlCommand::Disconnect => {
                    log::debug!("{}: transport connection closed", addr)
                }
                ControlCommand::Ack | ControlCommand::Nak => {}
            },
            Tpdu::Data(apdu) if apdu.apci == Apci::MaskVersionRead => {
                let (seq, descriptor) = match self.devices.get_mut(&addr) {
                    Some(device) => {
                        let seq = device.seq;
                        device.seq = (device.seq + 1) % SEQUENCE_MODULUS;
                        (seq, device.descriptor.clone())
                    }
                    None => return,
                };
                // Ack the request, then answer under the device's own
                // sequence number
                self.indicate(addr, request.source, Tpdu::ack(apdu.seq)).await;
                self.indicate(
                    addr,
                    request.source,
                    Tpdu::Data(Apdu::new_numbered(seq, Apci::MaskVersionResponse, descriptor)),
                )
                .await;
            }
            Tpdu::Data(apdu) => log::debug!("{}: unhandled service {}", addr, apdu.apci),
        }
    }

    async fn confirm(&self, request: LData, error: bool) {
        let mut ld = request;
        ld.control.error = error;
        let _ = self.frames.send(Frame::Confirm(ld)).await;
    }

    async fn indicate(&self, from: IndividualAddr, to: IndividualAddr, tpdu: Tpdu) {
        let ld = LData {
            control: ControlInfo::point_to_point(),
            source: from,
            destination: Destination::Device(to),
            tpdu,
        };
        let _ = self.frames.send(Frame::Indication(ld)).await;
    }
}

/// Wire a gateway to a fresh channel link
///
/// Returns the link and the inbound frame stream for the engine side,
/// plus the gateway ready to have devices registered and be spawned.
///
/// # Arguments
///
/// * `capacity` - Buffer size of both underlying channels
pub fn wired_gateway(capacity: usize) -> (ChannelLink, mpsc::Receiver<Frame>, SimGateway) {
    let (link, requests) = ChannelLink::channel(capacity);
    let (frames_tx, frames_rx) = mpsc::channel(capacity);
    (link, frames_rx, SimGateway::new(requests, frames_tx))
}
