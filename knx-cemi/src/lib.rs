//! cEMI message model for the KNX transport stack
//!
//! This crate provides the typed L_Data message model exchanged with a
//! tunnelling link: message kinds, control information, transport layer
//! PDUs and application layer service identifiers.

pub mod apci;
pub mod frame;
pub mod tpdu;

pub use apci::Apci;
pub use frame::{ControlInfo, Destination, Frame, LData, Priority};
pub use tpdu::{Apdu, ControlCommand, ControlTpdu, SEQUENCE_MODULUS, Tpdu};
