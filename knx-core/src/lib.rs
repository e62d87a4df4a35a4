//! Core types and utilities for the KNX transport stack
//!
//! This crate provides the address types and error handling used
//! throughout the KNX client implementation.

pub mod address;
pub mod error;

pub use address::{GroupAddr, IndividualAddr};
pub use error::{KnxError, KnxResult};
