//! Gateway emulator for the KNX transport stack
//!
//! This crate provides an in-process stand-in for a tunnelling gateway
//! and the devices behind it, used to exercise the engine without bus
//! hardware.

pub mod gateway;

pub use gateway::{SimGateway, wired_gateway};
