pub use knx_core::error::{KnxError, KnxResult};
