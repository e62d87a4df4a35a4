//! Link layer boundary for the KNX transport stack
//!
//! This crate provides the seam between the transport engine and
//! whatever carries cEMI traffic: the [`Link`] trait for outgoing
//! requests and an in-process [`ChannelLink`] implementation.

pub mod channel;
pub mod error;
pub mod link;

pub use channel::ChannelLink;
pub use error::{KnxError, KnxResult};
pub use link::Link;
