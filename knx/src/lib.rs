//! knx_rs - Rust client engine for the KNX bus
//!
//! This library implements the client side of KNX transport
//! connections tunnelled over a single link: per-device sessions
//! running sequence-numbered exchanges, tunnel-level multiplexing and
//! group telegram translation.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `knx-core`: Address types and error handling
//! - `knx-cemi`: cEMI L_Data message model
//! - `knx-link`: Link boundary towards the tunnelling transport
//! - `knx-transport`: Transport connections and tunnel multiplexing
//! - `knx-sim`: Gateway emulator for tests and demos
//!
//! # Implementation Status
//!
//! ## ✅ 已完成
//! - 地址类型（个体地址、组地址）
//! - cEMI 消息模型（L_Data、TPDU、APCI）
//! - 传输连接（连接建立、编号交换、关闭）
//! - 设备描述符读取
//! - 隧道复用（会话表、入站路由、组报文分发）
//! - 网关模拟器
//!
//! ## 📋 待实现
//! - 属性读写（Session 中已留接口）
//! - 存储器读写
//! - 用户消息
//! - 远端断开请求
//! - UDP 隧道链路（KNXnet/IP）
//!
//! # Usage
//!
//! ```no_run
//! use knx::transport::{Bus, BusConfig};
//! ```
//!
//! # Examples
//!
//! See the `knxscan` crate for a complete usage example.

// Re-export core types
pub use knx_core::{GroupAddr, IndividualAddr, KnxError, KnxResult};

// Re-export the message model
pub mod cemi {
    pub use knx_cemi::*;
}

// Re-export the link boundary
pub mod link {
    pub use knx_link::*;
}

// Re-export the transport engine
pub mod transport {
    pub use knx_transport::*;
}

// Re-export the gateway emulator
pub mod sim {
    pub use knx_sim::*;
}
