//! Group communication model

use bytes::Bytes;
use knx_cemi::{Apci, Apdu, Destination, LData, Tpdu};
use knx_core::{GroupAddr, IndividualAddr};

/// Kind of a group telegram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCommand {
    /// Query the current group value
    Read,
    /// Answer to a read
    Response,
    /// Update the group value
    Write,
}

impl GroupCommand {
    /// Map an application service onto a group command
    pub fn from_apci(apci: Apci) -> Option<Self> {
        match apci {
            Apci::GroupValueRead => Some(GroupCommand::Read),
            Apci::GroupValueResponse => Some(GroupCommand::Response),
            Apci::GroupValueWrite => Some(GroupCommand::Write),
            _ => None,
        }
    }

    /// Get the application service carrying this command
    pub fn apci(&self) -> Apci {
        match self {
            GroupCommand::Read => Apci::GroupValueRead,
            GroupCommand::Response => Apci::GroupValueResponse,
            GroupCommand::Write => Apci::GroupValueWrite,
        }
    }
}

/// A group telegram, decoupled from the cEMI frame that carried it
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEvent {
    /// What the telegram does
    pub command: GroupCommand,
    /// Device that sent the telegram
    pub source: IndividualAddr,
    /// Addressed group
    pub destination: GroupAddr,
    /// Group value payload
    pub data: Bytes,
}

impl GroupEvent {
    /// Translate a bus indication into a group event
    ///
    /// Returns `None` unless the indication is addressed to a group
    /// and carries one of the group value services. Everything else
    /// stays on the point-to-point path.
    pub fn from_indication(ld: &LData) -> Option<Self> {
        let group = match ld.destination {
            Destination::Group(group) => group,
            Destination::Device(_) => return None,
        };
        let apdu = match &ld.tpdu {
            Tpdu::Data(apdu) => apdu,
            Tpdu::Control(_) => return None,
        };
        let command = GroupCommand::from_apci(apdu.apci)?;
        Some(Self {
            command,
            source: ld.source,
            destination: group,
            data: apdu.data.clone(),
        })
    }

    /// Build the L_Data request that publishes this event on the bus
    pub fn into_ldata(self) -> LData {
        LData::for_group(
            self.destination,
            Tpdu::Data(Apdu::new(self.command.apci(), self.data)),
        )
    }
}
