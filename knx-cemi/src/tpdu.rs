//! Transport layer protocol data units

use crate::apci::Apci;
use bytes::Bytes;

/// Number of distinct transport sequence numbers (4-bit counter)
pub const SEQUENCE_MODULUS: u8 = 16;

/// Transport layer control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Connect,
    Disconnect,
    Ack,
    Nak,
}

/// Control TPDU steering a point-to-point transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlTpdu {
    /// Whether the TPDU carries a sequence number
    pub numbered: bool,
    /// Transport sequence number (0-15, meaningful only when numbered)
    pub seq: u8,
    /// Control command
    pub command: ControlCommand,
}

/// Data TPDU carrying an application layer service
#[derive(Debug, Clone, PartialEq)]
pub struct Apdu {
    /// Whether the TPDU carries a sequence number
    pub numbered: bool,
    /// Transport sequence number (0-15, meaningful only when numbered)
    pub seq: u8,
    /// Application layer service
    pub apci: Apci,
    /// Service payload
    pub data: Bytes,
}

impl Apdu {
    /// Create an unnumbered APDU, as used on group telegrams
    pub fn new(apci: Apci, data: Bytes) -> Self {
        Self {
            numbered: false,
            seq: 0,
            apci,
            data,
        }
    }

    /// Create a numbered APDU for a point-to-point transport connection
    pub fn new_numbered(seq: u8, apci: Apci, data: Bytes) -> Self {
        Self {
            numbered: true,
            seq,
            apci,
            data,
        }
    }
}

/// Transport layer payload of an L_Data frame
#[derive(Debug, Clone, PartialEq)]
pub enum Tpdu {
    /// Connection control (connect, disconnect, ack, nak)
    Control(ControlTpdu),
    /// Application data
    Data(Apdu),
}

impl Tpdu {
    /// Unnumbered connection request
    pub fn connect() -> Self {
        Tpdu::Control(ControlTpdu {
            numbered: false,
            seq: 0,
            command: ControlCommand::Connect,
        })
    }

    /// Unnumbered disconnect notice
    pub fn disconnect() -> Self {
        Tpdu::Control(ControlTpdu {
            numbered: false,
            seq: 0,
            command: ControlCommand::Disconnect,
        })
    }

    /// Numbered positive acknowledgment for `seq`
    pub fn ack(seq: u8) -> Self {
        Tpdu::Control(ControlTpdu {
            numbered: true,
            seq,
            command: ControlCommand::Ack,
        })
    }

    /// Numbered negative acknowledgment for `seq`
    pub fn nak(seq: u8) -> Self {
        Tpdu::Control(ControlTpdu {
            numbered: true,
            seq,
            command: ControlCommand::Nak,
        })
    }
}
