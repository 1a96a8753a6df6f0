//! 消息总线
//!
//! Framed TCP bus between the edge node and remote observers.
//!
//! # 模块结构
//!
//! - [`bus`] - `MessageBus`: broadcast channels and client registry
//! - [`tcp_server`] - accept loop, handshake, per-client forwarding
//! - [`transport`] - `Transport` trait, frame codec, TCP and memory transports
//! - [`client`] - `ObserverClient`, a Rust observer keeping a `MirrorView`

pub mod bus;
pub mod client;
pub mod tcp_server;
pub mod transport;

pub use bus::{MessageBus, TransportConfig};
pub use client::ObserverClient;
pub use shared::message::{BusMessage, EventType};
pub use transport::{MemoryTransport, TcpTransport, Transport};

/// 已连接的观察端
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConnectedClient {
    pub id: String,
    pub addr: Option<String>,
}
