//! Transport layer engine for KNX
//!
//! This crate implements the client side of point-to-point transport
//! connections and the tunnel-level multiplexing on top of a single
//! link: a [`Session`] drives one sequence-numbered connection, a
//! [`Bus`] fans the shared link out to many sessions and surfaces
//! group traffic as [`GroupEvent`] values.
//!
//! # TODO
//!
//! ## 传输连接
//! - [x] 连接建立（T_Connect 握手）
//! - [x] 设备描述符读取（编号请求/响应交换）
//! - [x] 序列号管理（4 位计数器，模 16 回绕）
//! - [x] 连接关闭（T_Disconnect 通知）
//! - [ ] 属性读写
//! - [ ] 存储器读写
//! - [ ] 用户消息
//! - [ ] 远端断开请求
//!
//! ## 隧道复用
//! - [x] 会话表管理（每设备一条连接）
//! - [x] 入站路由（指示按源地址、确认按目的地址）
//! - [x] 组报文分发
//! - [x] 转发任务和表项清理

pub mod bus;
pub mod error;
pub mod group;
pub mod session;
pub mod state;

pub use bus::{Bus, BusConfig};
pub use error::{KnxError, KnxResult};
pub use group::{GroupCommand, GroupEvent};
pub use session::Session;
pub use state::SessionState;
