//! Application layer service identifiers

use std::fmt;

/// Application layer service carried by a data TPDU
///
/// Covers the standardised application control field values used on
/// point-to-point and group telegrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apci {
    GroupValueRead,
    GroupValueResponse,
    GroupValueWrite,
    IndividualAddrWrite,
    IndividualAddrRead,
    IndividualAddrResponse,
    AdcRead,
    AdcResponse,
    MemoryRead,
    MemoryResponse,
    MemoryWrite,
    UserMessage,
    MaskVersionRead,
    MaskVersionResponse,
    Restart,
    Escape,
}

impl Apci {
    /// Check whether this service belongs to group communication
    pub fn is_group_command(&self) -> bool {
        matches!(
            self,
            Apci::GroupValueRead | Apci::GroupValueResponse | Apci::GroupValueWrite
        )
    }

    /// Get the service name for log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Apci::GroupValueRead => "GroupValueRead",
            Apci::GroupValueResponse => "GroupValueResponse",
            Apci::GroupValueWrite => "GroupValueWrite",
            Apci::IndividualAddrWrite => "IndividualAddrWrite",
            Apci::IndividualAddrRead => "IndividualAddrRead",
            Apci::IndividualAddrResponse => "IndividualAddrResponse",
            Apci::AdcRead => "AdcRead",
            Apci::AdcResponse => "AdcResponse",
            Apci::MemoryRead => "MemoryRead",
            Apci::MemoryResponse => "MemoryResponse",
            Apci::MemoryWrite => "MemoryWrite",
            Apci::UserMessage => "UserMessage",
            Apci::MaskVersionRead => "MaskVersionRead",
            Apci::MaskVersionResponse => "MaskVersionResponse",
            Apci::Restart => "Restart",
            Apci::Escape => "Escape",
        }
    }
}

impl fmt::Display for Apci {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
