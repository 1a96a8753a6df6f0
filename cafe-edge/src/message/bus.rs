//! 消息总线核心实现
//!
//! # 架构
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     MessageBus                           │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │  server_tx: broadcast::Sender<BusMessage>         │  │
//! │  │  client_tx: broadcast::Sender<BusMessage>         │  │
//! │  └───────────────────────────────────────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//!               ┌──────────┴──────────┐
//!               │    Transport Trait  │
//!               └──────────┬──────────┘
//!                  ┌───────┴────────┐
//!                  ▼                ▼
//!            TcpTransport     MemoryTransport
//! ```
//!
//! # 消息流
//!
//! ```text
//! Observer ──▶ tcp reader ──▶ client_tx ──▶ Mirror (Handshake / RequestSync)
//!
//! Mirror ──▶ publish() ──▶ server_tx ──▶ per-client forwarder ──▶ Observer
//!                                         (target / exclude filter)
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use shared::error::{AppError, ErrorCode};
use shared::message::BusMessage;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::ConnectedClient;
use super::transport::{MemoryTransport, Transport};

/// Configuration for transport layer
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tcp_listen_addr: String,
    /// Capacity of the broadcast channels (default: 1024)
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tcp_listen_addr: "0.0.0.0:8081".to_string(),
            channel_capacity: 1024,
        }
    }
}

/// 消息总线 - 负责消息路由和转发
///
/// # 职责
///
/// - 消息路由 (publish, send_to_server, send_to_client)
/// - 客户端管理 (connected clients registry)
/// - 传输层抽象 (TCP/Memory)
#[derive(Debug, Clone)]
pub struct MessageBus {
    /// 客户端到服务器的消息通道
    client_tx: broadcast::Sender<BusMessage>,
    /// 服务器到客户端的广播通道
    server_tx: broadcast::Sender<BusMessage>,
    pub(crate) config: TransportConfig,
    shutdown_token: CancellationToken,
    /// 已连接的客户端 (Client ID -> Transport)
    pub(crate) clients: Arc<DashMap<String, Arc<dyn Transport>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::from_config(TransportConfig::default())
    }

    pub fn from_config(config: TransportConfig) -> Self {
        let capacity = config.channel_capacity.max(1);
        let (client_tx, _) = broadcast::channel(capacity);
        let (server_tx, _) = broadcast::channel(capacity);
        Self {
            client_tx,
            server_tx,
            config,
            shutdown_token: CancellationToken::new(),
            clients: Arc::new(DashMap::new()),
        }
    }

    /// 发布消息 (服务器 -> 所有订阅者)
    ///
    /// Non-blocking. Returns how many subscribers will see the message; the
    /// error case means nobody is listening right now.
    pub fn publish(&self, msg: BusMessage) -> Result<usize, AppError> {
        self.server_tx
            .send(msg)
            .map_err(|_| AppError::with_message(ErrorCode::NetworkError, "No observers connected"))
    }

    /// 发送消息到服务器 (客户端 -> 服务器)
    pub fn send_to_server(&self, msg: BusMessage) -> Result<(), AppError> {
        self.client_tx
            .send(msg)
            .map_err(|e| AppError::internal(e.to_string()))?;
        Ok(())
    }

    /// 直接写入指定客户端的连接 (绕过广播通道)
    ///
    /// 客户端未连接返回 404
    pub async fn send_to_client(&self, client_id: &str, msg: BusMessage) -> Result<(), AppError> {
        // clone the transport out so the map shard is not locked across the write
        let transport = self.clients.get(client_id).map(|t| t.value().clone());
        match transport {
            Some(transport) => transport.write_message(&msg).await.map_err(|e| {
                AppError::with_message(
                    ErrorCode::NetworkError,
                    format!("Failed to send to client {}: {}", client_id, e),
                )
            }),
            None => Err(AppError::not_found(format!("Client {}", client_id))),
        }
    }

    /// 订阅客户端消息 (服务器专用)
    pub fn subscribe_to_clients(&self) -> broadcast::Receiver<BusMessage> {
        self.client_tx.subscribe()
    }

    /// 订阅服务器广播
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.server_tx.subscribe()
    }

    /// 同进程观察端的内存传输层
    pub fn memory_transport(&self, client_id: &str) -> MemoryTransport {
        MemoryTransport::with_client_sender(&self.server_tx, &self.client_tx, client_id)
    }

    pub fn sender_to_server(&self) -> &broadcast::Sender<BusMessage> {
        &self.client_tx
    }

    pub fn sender(&self) -> &broadcast::Sender<BusMessage> {
        &self.server_tx
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    pub fn get_connected_clients(&self) -> Vec<ConnectedClient> {
        self.clients
            .iter()
            .map(|entry| ConnectedClient {
                id: entry.key().clone(),
                addr: entry.value().peer_addr(),
            })
            .collect()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// 优雅关闭消息总线 (包括 TCP 服务器和所有连接)
    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Transport;
    use shared::message::{EventType, NotificationPayload, RequestSyncPayload};

    #[tokio::test]
    async fn test_publish_without_subscribers_is_error() {
        let bus = MessageBus::new();
        let msg = BusMessage::notification(&NotificationPayload::info("t", "m")).unwrap();
        assert!(bus.publish(msg).is_err());
    }

    #[tokio::test]
    async fn test_publish_reaches_memory_observer() {
        let bus = MessageBus::new();
        let observer = bus.memory_transport("phone-1");

        let msg = BusMessage::notification(&NotificationPayload::info("t", "m")).unwrap();
        assert_eq!(bus.publish(msg.clone()).unwrap(), 1);

        let received = observer.read_message().await.unwrap();
        assert_eq!(received.request_id, msg.request_id);
    }

    #[tokio::test]
    async fn test_memory_observer_reaches_server() {
        let bus = MessageBus::new();
        let mut server_rx = bus.subscribe_to_clients();
        let observer = bus.memory_transport("phone-1");

        let msg = BusMessage::request_sync(&RequestSyncPayload::default()).unwrap();
        observer.write_message(&msg).await.unwrap();

        let received = server_rx.recv().await.unwrap();
        assert_eq!(received.event_type, EventType::RequestSync);
        assert_eq!(received.source.as_deref(), Some("phone-1"));
    }

    #[tokio::test]
    async fn test_send_to_unknown_client_is_not_found() {
        let bus = MessageBus::new();
        let msg = BusMessage::notification(&NotificationPayload::info("t", "m")).unwrap();
        let err = bus.send_to_client("ghost", msg).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
