//! cEMI L_Data message model

use crate::tpdu::Tpdu;
use knx_core::{GroupAddr, IndividualAddr};

/// Message priority of an L_Data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    System,
    Normal,
    Urgent,
    Low,
}

/// Control information of an L_Data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlInfo {
    /// Message priority on the bus
    pub priority: Priority,
    /// Whether the frame may be repeated on the medium
    pub repeat: bool,
    /// Whether the frame takes part in system broadcast
    pub system_broadcast: bool,
    /// Whether a layer-2 acknowledge is requested
    pub ack_request: bool,
    /// Confirmation outcome; set on a confirmation whose send failed
    pub error: bool,
    /// Remaining hop count
    pub hops: u8,
}

impl ControlInfo {
    /// Control defaults for point-to-point telegrams
    ///
    /// System priority, repetition and system broadcast suppressed,
    /// a layer-2 acknowledge requested, hop count 6.
    pub fn point_to_point() -> Self {
        Self {
            priority: Priority::System,
            repeat: false,
            system_broadcast: false,
            ack_request: true,
            error: false,
            hops: 6,
        }
    }

    /// Control defaults for group telegrams
    ///
    /// Same as point-to-point but with low priority.
    pub fn group() -> Self {
        Self {
            priority: Priority::Low,
            ..Self::point_to_point()
        }
    }
}

/// Destination of an L_Data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Point-to-point telegram to a single device
    Device(IndividualAddr),
    /// One-to-many telegram to a group
    Group(GroupAddr),
}

/// L_Data payload shared by requests, confirmations and indications
#[derive(Debug, Clone, PartialEq)]
pub struct LData {
    /// Control information
    pub control: ControlInfo,
    /// Originating device; 0.0.0 on outgoing telegrams, the gateway
    /// substitutes its own address
    pub source: IndividualAddr,
    /// Destination device or group
    pub destination: Destination,
    /// Transport layer payload
    pub tpdu: Tpdu,
}

impl LData {
    /// Build a point-to-point telegram with the standard control defaults
    pub fn for_device(destination: IndividualAddr, tpdu: Tpdu) -> Self {
        Self {
            control: ControlInfo::point_to_point(),
            source: IndividualAddr::default(),
            destination: Destination::Device(destination),
            tpdu,
        }
    }

    /// Build a group telegram with the standard control defaults
    pub fn for_group(destination: GroupAddr, tpdu: Tpdu) -> Self {
        Self {
            control: ControlInfo::group(),
            source: IndividualAddr::default(),
            destination: Destination::Group(destination),
            tpdu,
        }
    }
}

/// cEMI message kind together with its L_Data payload
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// L_Data.req, a frame this side wants transmitted
    Request(LData),
    /// L_Data.con, the link's confirmation of an earlier request
    Confirm(LData),
    /// L_Data.ind, traffic arriving from the bus
    Indication(LData),
}

impl Frame {
    /// Get the service name of this message kind
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Request(_) => "L_Data.req",
            Frame::Confirm(_) => "L_Data.con",
            Frame::Indication(_) => "L_Data.ind",
        }
    }

    /// Borrow the L_Data payload regardless of kind
    pub fn ldata(&self) -> &LData {
        match self {
            Frame::Request(ld) | Frame::Confirm(ld) | Frame::Indication(ld) => ld,
        }
    }
}
