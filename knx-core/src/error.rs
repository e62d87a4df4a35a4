use crate::address::IndividualAddr;
use std::time::Duration;
use thiserror::Error;

/// Main error type for KNX operations
#[derive(Error, Debug)]
pub enum KnxError {
    #[error("Transport connection to {0} already exists")]
    AlreadyConnected(IndividualAddr),

    #[error("Connection error")]
    ConnectionError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected frame kind: expected {expected}, got {got}")]
    UnexpectedFrameKind {
        expected: &'static str,
        got: &'static str,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Sequence mismatch: expected {expected}, got {got}")]
    SequenceMismatch { expected: u8, got: u8 },

    #[error("Close of closed connection")]
    AlreadyClosed,

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Link closed")]
    LinkClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for KNX operations
pub type KnxResult<T> = Result<T, KnxError>;
