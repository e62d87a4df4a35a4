//! Point-to-point transport connection

use crate::error::{KnxError, KnxResult};
use crate::state::SessionState;
use bytes::Bytes;
use knx_cemi::{Apci, Apdu, ControlCommand, Frame, LData, SEQUENCE_MODULUS, Tpdu};
use knx_core::IndividualAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Client side of one sequence-numbered transport connection
///
/// A session is created by [`Bus::dial`](crate::bus::Bus::dial) and owns
/// the connection to a single device: the connection state, both 4-bit
/// sequence counters and the queues wiring it into the tunnel. Exchanges
/// take `&mut self`, so a session runs one request/response cycle at a
/// time.
///
/// Any timeout or protocol mismatch during an exchange closes the
/// session permanently; a fresh one has to be dialled afterwards.
pub struct Session {
    addr: IndividualAddr,
    state: SessionState,
    /// Sequence number for the next outgoing numbered TPDU
    out_seq: u8,
    /// Sequence number expected on the next incoming numbered TPDU
    in_seq: u8,
    /// Frames the tunnel routed to this connection
    inbound: mpsc::Receiver<Frame>,
    /// Requests handed to the per-session forwarding task
    outbound: mpsc::Sender<LData>,
    cancel: CancellationToken,
    response_timeout: Duration,
}

impl Session {
    pub(crate) fn new(
        addr: IndividualAddr,
        inbound: mpsc::Receiver<Frame>,
        outbound: mpsc::Sender<LData>,
        cancel: CancellationToken,
        response_timeout: Duration,
    ) -> Self {
        Self {
            addr,
            state: SessionState::default(),
            out_seq: 0,
            in_seq: 0,
            inbound,
            outbound,
            cancel,
            response_timeout,
        }
    }

    /// Get the address of the connected device
    pub fn addr(&self) -> IndividualAddr {
        self.addr
    }

    /// Get the current connection state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if the connection has been closed
    pub fn closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Get the sequence number of the next outgoing numbered TPDU
    pub fn out_sequence(&self) -> u8 {
        self.out_seq
    }

    /// Get the sequence number expected on the next incoming numbered TPDU
    pub fn in_sequence(&self) -> u8 {
        self.in_seq
    }

    /// Establish the transport connection
    ///
    /// Queues an unnumbered connection request and waits up to the
    /// response timeout for the link to react. An error-flagged
    /// confirmation fails the handshake; any other frame counts as
    /// success. On failure the session is closed before the error is
    /// returned.
    pub(crate) async fn connect(&mut self) -> KnxResult<()> {
        self.state = SessionState::Connecting;
        log::debug!("{}: transport connect", self.addr);

        let request = LData::for_device(self.addr, Tpdu::connect());
        if self.outbound.send(request).await.is_err() {
            let _ = self.close();
            return Err(KnxError::LinkClosed);
        }

        let deadline = Instant::now() + self.response_timeout;
        match self.recv_deadline(deadline).await {
            Ok(Frame::Confirm(ld)) if ld.control.error => {
                let _ = self.close();
                Err(KnxError::ConnectionError)
            }
            Ok(_) => {
                self.state = SessionState::Open;
                log::debug!("{}: transport connection open", self.addr);
                Ok(())
            }
            Err(e) => {
                let _ = self.close();
                Err(e)
            }
        }
    }

    /// Read the device descriptor of the connected device
    ///
    /// Runs one numbered request/response exchange: the read request is
    /// sent and confirmed, the peer's transport acknowledgment and its
    /// numbered response are awaited, and the response in turn is
    /// acknowledged before the descriptor data is returned. Each step
    /// waits at most the configured response timeout.
    ///
    /// # Arguments
    ///
    /// * `descriptor_type` - Descriptor type field of the read request
    ///
    /// # Returns
    ///
    /// The descriptor data reported by the device. Any timeout or
    /// protocol mismatch closes the session and is returned as the
    /// corresponding error.
    pub async fn device_descriptor_read(&mut self, descriptor_type: &[u8]) -> KnxResult<Bytes> {
        if !self.state.is_open() {
            return Err(KnxError::AlreadyClosed);
        }

        match self.descriptor_read_exchange(descriptor_type).await {
            Ok(data) => Ok(data),
            Err(e) => {
                let _ = self.close();
                Err(e)
            }
        }
    }

    async fn descriptor_read_exchange(&mut self, descriptor_type: &[u8]) -> KnxResult<Bytes> {
        // Step 1: numbered read request
        let apdu = Apdu::new_numbered(
            self.out_seq,
            Apci::MaskVersionRead,
            Bytes::copy_from_slice(descriptor_type),
        );
        let request = LData::for_device(self.addr, Tpdu::Data(apdu));
        self.outbound
            .send(request)
            .await
            .map_err(|_| KnxError::LinkClosed)?;

        // Step 2: the link must confirm the send before anything else
        let deadline = Instant::now() + self.response_timeout;
        match self.recv_deadline(deadline).await? {
            Frame::Confirm(ld) => {
                if ld.control.error {
                    return Err(KnxError::ConnectionError);
                }
            }
            other => {
                return Err(KnxError::UnexpectedFrameKind {
                    expected: "L_Data.con",
                    got: other.kind(),
                });
            }
        }
        self.out_seq = (self.out_seq + 1) % SEQUENCE_MODULUS;

        // Step 3: transport acknowledgment from the peer. Unrelated
        // indications may arrive first and are skipped under the same
        // deadline.
        let deadline = Instant::now() + self.response_timeout;
        loop {
            match self.recv_deadline(deadline).await? {
                Frame::Indication(ld) => match &ld.tpdu {
                    Tpdu::Control(ctrl) if ctrl.command == ControlCommand::Ack => break,
                    _ => {
                        log::debug!("{}: indication before transport ack, still waiting", self.addr)
                    }
                },
                other => {
                    return Err(KnxError::UnexpectedFrameKind {
                        expected: "L_Data.ind",
                        got: other.kind(),
                    });
                }
            }
        }

        // Step 4: the numbered response itself
        let deadline = Instant::now() + self.response_timeout;
        let (seq, data) = match self.recv_deadline(deadline).await? {
            Frame::Indication(ld) => match ld.tpdu {
                Tpdu::Data(apdu) => {
                    if apdu.apci != Apci::MaskVersionResponse {
                        return Err(KnxError::UnexpectedResponse(format!(
                            "expected {}, got {}",
                            Apci::MaskVersionResponse,
                            apdu.apci
                        )));
                    }
                    if apdu.seq != self.in_seq {
                        return Err(KnxError::SequenceMismatch {
                            expected: self.in_seq,
                            got: apdu.seq,
                        });
                    }
                    (apdu.seq, apdu.data)
                }
                Tpdu::Control(_) => {
                    return Err(KnxError::UnexpectedResponse(
                        "control TPDU in place of the response".to_string(),
                    ));
                }
            },
            other => {
                return Err(KnxError::UnexpectedFrameKind {
                    expected: "L_Data.ind",
                    got: other.kind(),
                });
            }
        };

        // The response was numbered, so the peer is owed an ack for it
        let ack = LData::for_device(self.addr, Tpdu::ack(seq));
        self.outbound
            .send(ack)
            .await
            .map_err(|_| KnxError::LinkClosed)?;
        self.in_seq = (self.in_seq + 1) % SEQUENCE_MODULUS;

        Ok(data)
    }

    /// Read an interface object property
    ///
    /// Not implemented yet.
    pub async fn property_read(&mut self) -> KnxResult<Bytes> {
        Err(KnxError::NotImplemented("property read"))
    }

    /// Write an interface object property
    ///
    /// Not implemented yet.
    pub async fn property_write(&mut self) -> KnxResult<()> {
        Err(KnxError::NotImplemented("property write"))
    }

    /// Read device memory
    ///
    /// Not implemented yet.
    pub async fn memory_read(&mut self) -> KnxResult<Bytes> {
        Err(KnxError::NotImplemented("memory read"))
    }

    /// Write device memory
    ///
    /// Not implemented yet.
    pub async fn memory_write(&mut self) -> KnxResult<()> {
        Err(KnxError::NotImplemented("memory write"))
    }

    /// Send a manufacturer specific user message
    ///
    /// Not implemented yet.
    pub async fn user_message(&mut self) -> KnxResult<()> {
        Err(KnxError::NotImplemented("user message"))
    }

    /// Ask the peer to drop the connection from its side
    ///
    /// Not implemented yet; [`close`](Session::close) tears the
    /// connection down locally.
    pub async fn disconnect_request(&mut self) -> KnxResult<()> {
        Err(KnxError::NotImplemented("disconnect request"))
    }

    /// Close the transport connection
    ///
    /// Queues a best-effort disconnect notice, stops the forwarding
    /// task and shuts the inbound queue so the tunnel stops routing to
    /// this connection. Closing an already closed session fails with
    /// [`KnxError::AlreadyClosed`].
    pub fn close(&mut self) -> KnxResult<()> {
        if self.state.is_closed() {
            return Err(KnxError::AlreadyClosed);
        }
        self.state = SessionState::Disconnecting;

        // Best-effort notice; no reply is expected and the queue may
        // already be gone.
        let notice = LData::for_device(self.addr, Tpdu::disconnect());
        let _ = self.outbound.try_send(notice);

        self.cancel.cancel();
        self.inbound.close();
        self.state = SessionState::Closed;
        log::debug!("{}: transport connection closed", self.addr);
        Ok(())
    }

    /// Wait for the next routed frame, bounded by `deadline`
    async fn recv_deadline(&mut self, deadline: Instant) -> KnxResult<Frame> {
        match tokio::time::timeout_at(deadline, self.inbound.recv()).await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(KnxError::LinkClosed),
            Err(_) => Err(KnxError::Timeout(self.response_timeout)),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // A dropped session still has to stop its forwarding task; the
        // tunnel purges the table entry once the token fires.
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knx_cemi::{ControlInfo, Destination};

    fn test_addr() -> IndividualAddr {
        IndividualAddr::new(1, 1, 5).unwrap()
    }

    fn wired_session(timeout: Duration) -> (Session, mpsc::Sender<Frame>, mpsc::Receiver<LData>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(1);
        let (outbound_tx, outbound_rx) = mpsc::channel(4);
        let session = Session::new(
            test_addr(),
            inbound_rx,
            outbound_tx,
            CancellationToken::new(),
            timeout,
        );
        (session, inbound_tx, outbound_rx)
    }

    fn confirm_of(request: &LData, error: bool) -> Frame {
        let mut ld = request.clone();
        ld.control.error = error;
        Frame::Confirm(ld)
    }

    fn indication(tpdu: Tpdu) -> Frame {
        Frame::Indication(LData {
            control: ControlInfo::point_to_point(),
            source: test_addr(),
            destination: Destination::Device(IndividualAddr::default()),
            tpdu,
        })
    }

    fn request_seq(request: &LData) -> u8 {
        match &request.tpdu {
            Tpdu::Data(apdu) => apdu.seq,
            _ => panic!("expected data TPDU"),
        }
    }

    async fn open_session(
        timeout: Duration,
    ) -> (Session, mpsc::Sender<Frame>, mpsc::Receiver<LData>) {
        let (mut session, inbound_tx, mut outbound_rx) = wired_session(timeout);
        let peer = async {
            let request = outbound_rx.recv().await.unwrap();
            inbound_tx.send(confirm_of(&request, false)).await.unwrap();
        };
        let (result, _) = tokio::join!(session.connect(), peer);
        result.unwrap();
        (session, inbound_tx, outbound_rx)
    }

    /// Scripted peer for one full descriptor read: confirm the request,
    /// ack it, respond with `descriptor` under `response_seq`, then
    /// return the request and the client's ack for assertions.
    async fn serve_descriptor_read(
        inbound_tx: &mpsc::Sender<Frame>,
        outbound_rx: &mut mpsc::Receiver<LData>,
        response_seq: u8,
        descriptor: &'static [u8],
    ) -> (LData, LData) {
        let request = outbound_rx.recv().await.unwrap();
        inbound_tx.send(confirm_of(&request, false)).await.unwrap();
        inbound_tx
            .send(indication(Tpdu::ack(request_seq(&request))))
            .await
            .unwrap();
        inbound_tx
            .send(indication(Tpdu::Data(Apdu::new_numbered(
                response_seq,
                Apci::MaskVersionResponse,
                Bytes::from_static(descriptor),
            ))))
            .await
            .unwrap();
        let ack = outbound_rx.recv().await.unwrap();
        (request, ack)
    }

    #[tokio::test]
    async fn test_connect_success() {
        let (mut session, inbound_tx, mut outbound_rx) = wired_session(Duration::from_secs(1));

        let peer = async {
            let request = outbound_rx.recv().await.unwrap();
            assert_eq!(request.destination, Destination::Device(test_addr()));
            assert_eq!(request.control, ControlInfo::point_to_point());
            assert_eq!(request.tpdu, Tpdu::connect());
            inbound_tx.send(confirm_of(&request, false)).await.unwrap();
        };
        let (result, _) = tokio::join!(session.connect(), peer);

        result.unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert!(!session.closed());
    }

    #[tokio::test]
    async fn test_connect_accepts_any_frame() {
        let (mut session, inbound_tx, mut outbound_rx) = wired_session(Duration::from_secs(1));

        let peer = async {
            let _ = outbound_rx.recv().await.unwrap();
            inbound_tx
                .send(indication(Tpdu::Data(Apdu::new(
                    Apci::GroupValueWrite,
                    Bytes::from_static(&[0x01]),
                ))))
                .await
                .unwrap();
        };
        let (result, _) = tokio::join!(session.connect(), peer);

        result.unwrap();
        assert_eq!(session.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn test_connect_error_confirmation() {
        let (mut session, inbound_tx, mut outbound_rx) = wired_session(Duration::from_secs(1));

        let peer = async {
            let request = outbound_rx.recv().await.unwrap();
            inbound_tx.send(confirm_of(&request, true)).await.unwrap();
        };
        let (result, _) = tokio::join!(session.connect(), peer);

        assert!(matches!(result, Err(KnxError::ConnectionError)));
        assert!(session.closed());
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let (mut session, _inbound_tx, _outbound_rx) = wired_session(Duration::from_millis(50));

        let result = session.connect().await;

        assert!(matches!(result, Err(KnxError::Timeout(_))));
        assert!(session.closed());
    }

    #[tokio::test]
    async fn test_descriptor_read() {
        let (mut session, inbound_tx, mut outbound_rx) = open_session(Duration::from_secs(1)).await;

        let peer = serve_descriptor_read(&inbound_tx, &mut outbound_rx, 0, &[0x00, 0x1E]);
        let (result, (request, ack)) =
            tokio::join!(session.device_descriptor_read(&[0x07, 0xB0]), peer);

        // The request carries our sequence number and the descriptor type
        match &request.tpdu {
            Tpdu::Data(apdu) => {
                assert!(apdu.numbered);
                assert_eq!(apdu.seq, 0);
                assert_eq!(apdu.apci, Apci::MaskVersionRead);
                assert_eq!(apdu.data.as_ref(), &[0x07, 0xB0]);
            }
            _ => panic!("expected data TPDU"),
        }

        // The response is acked with its own sequence number
        assert_eq!(ack.tpdu, Tpdu::ack(0));

        assert_eq!(result.unwrap().as_ref(), &[0x00, 0x1E]);
        assert_eq!(session.out_sequence(), 1);
        assert_eq!(session.in_sequence(), 1);
        assert!(!session.closed());
    }

    #[tokio::test]
    async fn test_descriptor_read_twice_advances_sequences() {
        let (mut session, inbound_tx, mut outbound_rx) = open_session(Duration::from_secs(1)).await;

        let peer = serve_descriptor_read(&inbound_tx, &mut outbound_rx, 0, &[0x00, 0x1E]);
        let (result, _) = tokio::join!(session.device_descriptor_read(&[0x00]), peer);
        result.unwrap();

        let peer = serve_descriptor_read(&inbound_tx, &mut outbound_rx, 1, &[0x00, 0x1E]);
        let (result, (request, ack)) = tokio::join!(session.device_descriptor_read(&[0x00]), peer);

        result.unwrap();
        assert_eq!(request_seq(&request), 1);
        assert_eq!(ack.tpdu, Tpdu::ack(1));
        assert_eq!(session.out_sequence(), 2);
        assert_eq!(session.in_sequence(), 2);
    }

    #[tokio::test]
    async fn test_descriptor_read_tolerates_unrelated_indication() {
        let (mut session, inbound_tx, mut outbound_rx) = open_session(Duration::from_secs(1)).await;

        let peer = async {
            let request = outbound_rx.recv().await.unwrap();
            inbound_tx.send(confirm_of(&request, false)).await.unwrap();
            // A group telegram sneaks in before the transport ack
            inbound_tx
                .send(indication(Tpdu::Data(Apdu::new(
                    Apci::GroupValueWrite,
                    Bytes::from_static(&[0x01]),
                ))))
                .await
                .unwrap();
            inbound_tx
                .send(indication(Tpdu::ack(request_seq(&request))))
                .await
                .unwrap();
            inbound_tx
                .send(indication(Tpdu::Data(Apdu::new_numbered(
                    0,
                    Apci::MaskVersionResponse,
                    Bytes::from_static(&[0x00, 0x1E]),
                ))))
                .await
                .unwrap();
            let _ = outbound_rx.recv().await.unwrap();
        };
        let (result, _) = tokio::join!(session.device_descriptor_read(&[0x00]), peer);

        assert_eq!(result.unwrap().as_ref(), &[0x00, 0x1E]);
        assert!(!session.closed());
    }

    #[tokio::test]
    async fn test_descriptor_read_error_confirmation() {
        let (mut session, inbound_tx, mut outbound_rx) = open_session(Duration::from_secs(1)).await;

        let peer = async {
            let request = outbound_rx.recv().await.unwrap();
            inbound_tx.send(confirm_of(&request, true)).await.unwrap();
        };
        let (result, _) = tokio::join!(session.device_descriptor_read(&[0x00]), peer);

        assert!(matches!(result, Err(KnxError::ConnectionError)));
        assert!(session.closed());
    }

    #[tokio::test]
    async fn test_descriptor_read_unexpected_frame_kind() {
        let (mut session, inbound_tx, mut outbound_rx) = open_session(Duration::from_secs(1)).await;

        let peer = async {
            let request = outbound_rx.recv().await.unwrap();
            inbound_tx.send(confirm_of(&request, false)).await.unwrap();
            // A second confirmation where the transport ack belongs
            inbound_tx.send(confirm_of(&request, false)).await.unwrap();
        };
        let (result, _) = tokio::join!(session.device_descriptor_read(&[0x00]), peer);

        assert!(matches!(
            result,
            Err(KnxError::UnexpectedFrameKind {
                expected: "L_Data.ind",
                got: "L_Data.con",
            })
        ));
        assert!(session.closed());
    }

    #[tokio::test]
    async fn test_descriptor_read_wrong_service() {
        let (mut session, inbound_tx, mut outbound_rx) = open_session(Duration::from_secs(1)).await;

        let peer = async {
            let request = outbound_rx.recv().await.unwrap();
            inbound_tx.send(confirm_of(&request, false)).await.unwrap();
            inbound_tx
                .send(indication(Tpdu::ack(request_seq(&request))))
                .await
                .unwrap();
            inbound_tx
                .send(indication(Tpdu::Data(Apdu::new_numbered(
                    0,
                    Apci::MemoryResponse,
                    Bytes::new(),
                ))))
                .await
                .unwrap();
        };
        let (result, _) = tokio::join!(session.device_descriptor_read(&[0x00]), peer);

        assert!(matches!(result, Err(KnxError::UnexpectedResponse(_))));
        assert!(session.closed());
    }

    #[tokio::test]
    async fn test_descriptor_read_sequence_mismatch() {
        let (mut session, inbound_tx, mut outbound_rx) = open_session(Duration::from_secs(1)).await;

        let peer = async {
            let request = outbound_rx.recv().await.unwrap();
            inbound_tx.send(confirm_of(&request, false)).await.unwrap();
            inbound_tx
                .send(indication(Tpdu::ack(request_seq(&request))))
                .await
                .unwrap();
            inbound_tx
                .send(indication(Tpdu::Data(Apdu::new_numbered(
                    5,
                    Apci::MaskVersionResponse,
                    Bytes::new(),
                ))))
                .await
                .unwrap();
        };
        let (result, _) = tokio::join!(session.device_descriptor_read(&[0x00]), peer);

        assert!(matches!(
            result,
            Err(KnxError::SequenceMismatch {
                expected: 0,
                got: 5,
            })
        ));
        assert!(session.closed());
    }

    #[tokio::test]
    async fn test_descriptor_read_timeout() {
        let (mut session, inbound_tx, mut outbound_rx) =
            open_session(Duration::from_millis(50)).await;

        let peer = async {
            // Confirm the request, then go silent
            let request = outbound_rx.recv().await.unwrap();
            inbound_tx.send(confirm_of(&request, false)).await.unwrap();
        };
        let (result, _) = tokio::join!(session.device_descriptor_read(&[0x00]), peer);

        assert!(matches!(result, Err(KnxError::Timeout(_))));
        assert!(session.closed());
    }

    #[tokio::test]
    async fn test_sequence_wrap() {
        let (mut session, inbound_tx, mut outbound_rx) = open_session(Duration::from_secs(1)).await;
        session.out_seq = 15;
        session.in_seq = 15;

        let peer = serve_descriptor_read(&inbound_tx, &mut outbound_rx, 15, &[0x00, 0x1E]);
        let (result, (request, _)) = tokio::join!(session.device_descriptor_read(&[0x00]), peer);

        result.unwrap();
        assert_eq!(request_seq(&request), 15);
        assert_eq!(session.out_sequence(), 0);
        assert_eq!(session.in_sequence(), 0);
    }

    #[tokio::test]
    async fn test_close_sends_disconnect_notice() {
        let (mut session, _inbound_tx, mut outbound_rx) =
            open_session(Duration::from_secs(1)).await;

        session.close().unwrap();

        assert!(session.closed());
        assert_eq!(session.state(), SessionState::Closed);
        let notice = outbound_rx.recv().await.unwrap();
        assert_eq!(notice.tpdu, Tpdu::disconnect());
    }

    #[tokio::test]
    async fn test_close_twice() {
        let (mut session, _inbound_tx, _outbound_rx) =
            open_session(Duration::from_secs(1)).await;

        session.close().unwrap();
        assert!(matches!(session.close(), Err(KnxError::AlreadyClosed)));
    }

    #[tokio::test]
    async fn test_exchange_on_closed_session() {
        let (mut session, _inbound_tx, _outbound_rx) =
            open_session(Duration::from_secs(1)).await;
        session.close().unwrap();

        let result = session.device_descriptor_read(&[0x00]).await;
        assert!(matches!(result, Err(KnxError::AlreadyClosed)));
    }

    #[tokio::test]
    async fn test_capability_stubs() {
        let (mut session, _inbound_tx, _outbound_rx) =
            open_session(Duration::from_secs(1)).await;

        assert!(matches!(
            session.property_read().await,
            Err(KnxError::NotImplemented(_))
        ));
        assert!(matches!(
            session.property_write().await,
            Err(KnxError::NotImplemented(_))
        ));
        assert!(matches!(
            session.memory_read().await,
            Err(KnxError::NotImplemented(_))
        ));
        assert!(matches!(
            session.memory_write().await,
            Err(KnxError::NotImplemented(_))
        ));
        assert!(matches!(
            session.user_message().await,
            Err(KnxError::NotImplemented(_))
        ));
        assert!(matches!(
            session.disconnect_request().await,
            Err(KnxError::NotImplemented(_))
        ));
    }

    #[tokio::test]
    async fn test_drop_cancels_token() {
        let (session, _inbound_tx, _outbound_rx) = wired_session(Duration::from_secs(1));
        let token = session.cancel.clone();

        drop(session);
        assert!(token.is_cancelled());
    }
}
