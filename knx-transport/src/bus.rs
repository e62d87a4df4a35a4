//! Tunnel-level multiplexing of transport connections

use crate::error::{KnxError, KnxResult};
use crate::group::GroupEvent;
use crate::session::Session;
use knx_cemi::{Destination, Frame, LData};
use knx_core::IndividualAddr;
use knx_link::Link;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;

/// Buffer size of the group event output channel
const GROUP_EVENT_BUFFER: usize = 16;

/// Buffer size of a session's outbound request queue
const OUTBOUND_BUFFER: usize = 4;

/// Settings shared by every session created on a [`Bus`]
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Upper bound for every bounded wait inside a session exchange
    pub response_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(3),
        }
    }
}

/// Table entry wiring one transport connection into the dispatch loop
struct SessionEntry {
    /// Routing half of the session's inbound queue
    inbound_tx: mpsc::Sender<Frame>,
    /// Fires when the session is done with its forwarding task
    cancel: CancellationToken,
}

impl SessionEntry {
    /// Check if the session behind this entry is gone
    fn is_closed(&self) -> bool {
        self.inbound_tx.is_closed() || self.cancel.is_cancelled()
    }
}

/// Multiplexer fanning one tunnelling link out to many transport
/// connections
///
/// The bus owns the session table and a dispatch loop over the link's
/// inbound traffic: group telegrams surface as [`GroupEvent`] values,
/// indications are routed to sessions by source address, confirmations
/// by destination address. Frames nobody is waiting for are logged and
/// dropped, so unrelated bus traffic never fails the engine.
pub struct Bus<L: Link> {
    link: Arc<L>,
    sessions: Arc<RwLock<HashMap<IndividualAddr, SessionEntry>>>,
    config: BusConfig,
}

impl<L: Link + 'static> Bus<L> {
    /// Open a bus over a tunnelling link
    ///
    /// Spawns the dispatch loop over `inbound` and returns the bus
    /// together with the receiving end of the group traffic. The loop
    /// runs until the inbound channel ends; the group channel closes
    /// with it. Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `link` - Transmitting half of the tunnel
    /// * `inbound` - Frames arriving from the tunnel
    /// * `config` - Settings applied to every dialled session
    pub fn open(
        link: L,
        inbound: mpsc::Receiver<Frame>,
        config: BusConfig,
    ) -> (Self, mpsc::Receiver<GroupEvent>) {
        let sessions = Arc::new(RwLock::new(HashMap::new()));
        let (group_tx, group_rx) = mpsc::channel(GROUP_EVENT_BUFFER);
        tokio::spawn(serve(inbound, Arc::clone(&sessions), group_tx));

        let bus = Self {
            link: Arc::new(link),
            sessions,
            config,
        };
        (bus, group_rx)
    }

    /// Open a transport connection to a device
    ///
    /// Registers the connection in the session table, spawns its
    /// forwarding task and runs the connect handshake. At most one live
    /// connection per device is allowed; a leftover entry of a closed
    /// session is replaced.
    ///
    /// # Arguments
    ///
    /// * `addr` - Individual address of the device to connect
    ///
    /// # Returns
    ///
    /// The open [`Session`]. Fails with
    /// [`KnxError::AlreadyConnected`] if a live session for `addr`
    /// exists, or with the handshake error if the connect failed; a
    /// failed session is already closed and purged.
    pub async fn dial(&self, addr: IndividualAddr) -> KnxResult<Session> {
        let (inbound_tx, inbound_rx) = mpsc::channel(1);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let cancel = CancellationToken::new();

        {
            let mut sessions = self.sessions.write().await;
            if let Some(entry) = sessions.get(&addr) {
                if !entry.is_closed() {
                    return Err(KnxError::AlreadyConnected(addr));
                }
            }
            sessions.insert(
                addr,
                SessionEntry {
                    inbound_tx,
                    cancel: cancel.clone(),
                },
            );
        }
        log::debug!("dialing transport connection to {}", addr);

        tokio::spawn(forward(
            Arc::clone(&self.link),
            Arc::clone(&self.sessions),
            addr,
            outbound_rx,
            cancel.clone(),
        ));

        let mut session = Session::new(
            addr,
            inbound_rx,
            outbound_tx,
            cancel,
            self.config.response_timeout,
        );
        session.connect().await?;
        Ok(session)
    }

    /// Publish a group event on the bus
    pub async fn send_group(&self, event: GroupEvent) -> KnxResult<()> {
        self.link.send(event.into_ldata()).await
    }

    /// Check whether a live session for `addr` is registered
    pub async fn has_session(&self, addr: IndividualAddr) -> bool {
        let sessions = self.sessions.read().await;
        sessions
            .get(&addr)
            .map(|entry| !entry.is_closed())
            .unwrap_or(false)
    }
}

/// Per-session forwarding task
///
/// Relays the session's queued requests onto the link until the queue
/// ends or the session cancels. Frames already queued when the token
/// fires (the disconnect notice) are still flushed. On exit the task
/// purges the session's table entry, unless a fresh dial has already
/// replaced it.
async fn forward<L: Link>(
    link: Arc<L>,
    sessions: Arc<RwLock<HashMap<IndividualAddr, SessionEntry>>>,
    addr: IndividualAddr,
    mut outbound: mpsc::Receiver<LData>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = link.send(frame).await {
                        log::warn!("link send for {} failed, frame dropped: {}", addr, e);
                    }
                }
                None => break,
            },
            _ = cancel.cancelled() => {
                while let Ok(frame) = outbound.try_recv() {
                    if let Err(e) = link.send(frame).await {
                        log::warn!("link send for {} failed, frame dropped: {}", addr, e);
                    }
                }
                break;
            }
        }
    }

    let mut sessions = sessions.write().await;
    if let Some(entry) = sessions.get(&addr) {
        if entry.is_closed() {
            sessions.remove(&addr);
        }
    }
    log::debug!("forwarding task for {} exited", addr);
}

/// Dispatch loop over the link's inbound traffic
async fn serve(
    mut inbound: mpsc::Receiver<Frame>,
    sessions: Arc<RwLock<HashMap<IndividualAddr, SessionEntry>>>,
    group_tx: mpsc::Sender<GroupEvent>,
) {
    log::debug!("tunnel dispatch loop started");
    while let Some(frame) = inbound.recv().await {
        // Group telegrams peel off before any session lookup
        if let Frame::Indication(ld) = &frame {
            if let Some(event) = GroupEvent::from_indication(ld) {
                if group_tx.send(event).await.is_err() {
                    log::debug!("group event receiver dropped, event discarded");
                }
                continue;
            }
        }

        // Indications belong to the session of their sender,
        // confirmations to the session the request went to
        let addr = match &frame {
            Frame::Indication(ld) => ld.source,
            Frame::Confirm(ld) => match ld.destination {
                Destination::Device(addr) => addr,
                Destination::Group(group) => {
                    log::debug!("confirmation of group telegram to {}, nothing to route", group);
                    continue;
                }
            },
            Frame::Request(_) => {
                log::debug!("request frame on the inbound path, dropped");
                continue;
            }
        };

        let target = {
            let sessions = sessions.read().await;
            sessions
                .get(&addr)
                .map(|entry| (entry.inbound_tx.clone(), entry.is_closed()))
        };
        match target {
            None => log::debug!("no transport session for {}, frame dropped", addr),
            Some((_, true)) => {
                let mut sessions = sessions.write().await;
                if let Some(entry) = sessions.get(&addr) {
                    if entry.is_closed() {
                        sessions.remove(&addr);
                    }
                }
                log::debug!("transport session for {} is closed, frame dropped", addr);
            }
            Some((tx, false)) => {
                // One-frame hand-off; the send releases as soon as the
                // session takes the previous frame or shuts its queue
                if tx.send(frame).await.is_err() {
                    log::debug!(
                        "transport session for {} closed during delivery, frame dropped",
                        addr
                    );
                }
            }
        }
    }
    log::debug!("link inbound ended, tunnel dispatch loop exited");
}
