//! Memory 传输层实现 (同进程通信)

use std::sync::Arc;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::message::BusMessage;
use tokio::sync::Mutex;
use tokio::sync::broadcast;

use super::Transport;

/// In-process transport over the bus broadcast channels
///
/// Reads see every server broadcast (routing is up to the reader, see
/// [`BusMessage::is_for`]); writes go to the client→server channel when a
/// sender was given. 用于测试或同进程观察端。
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    rx: Arc<Mutex<broadcast::Receiver<BusMessage>>>,
    tx: Option<broadcast::Sender<BusMessage>>,
    client_id: Option<String>,
}

impl MemoryTransport {
    /// Receive-only transport
    pub fn new(server_tx: &broadcast::Sender<BusMessage>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(server_tx.subscribe())),
            tx: None,
            client_id: None,
        }
    }

    /// Transport that can also send to the server, tagging messages with `client_id`
    pub fn with_client_sender(
        server_tx: &broadcast::Sender<BusMessage>,
        client_tx: &broadcast::Sender<BusMessage>,
        client_id: &str,
    ) -> Self {
        Self {
            rx: Arc::new(Mutex::new(server_tx.subscribe())),
            tx: Some(client_tx.clone()),
            client_id: Some(client_id.to_string()),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<BusMessage, AppError> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if let Some(id) = &self.client_id
                        && !msg.is_for(id)
                    {
                        continue;
                    }
                    return Ok(msg);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(dropped = n, "Memory transport lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(AppError::new(ErrorCode::ClientDisconnected));
                }
            }
        }
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError> {
        if let Some(tx) = &self.tx {
            let mut msg = msg.clone();
            msg.source = self.client_id.clone();
            tx.send(msg)
                .map_err(|e| AppError::with_message(ErrorCode::NetworkError, e.to_string()))?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{NotificationPayload, RequestSyncPayload};

    #[tokio::test]
    async fn test_memory_transport_routes_by_client() {
        let (server_tx, _) = broadcast::channel(16);
        let (client_tx, mut server_rx) = broadcast::channel(16);
        let transport = MemoryTransport::with_client_sender(&server_tx, &client_tx, "phone-1");

        // unicast for someone else is skipped
        let other = BusMessage::notification(&NotificationPayload::info("a", "b"))
            .unwrap()
            .with_target("phone-2");
        let mine = BusMessage::notification(&NotificationPayload::info("c", "d"))
            .unwrap()
            .with_target("phone-1");
        server_tx.send(other).unwrap();
        server_tx.send(mine.clone()).unwrap();
        assert_eq!(transport.read_message().await.unwrap().request_id, mine.request_id);

        let request = BusMessage::request_sync(&RequestSyncPayload::default()).unwrap();
        transport.write_message(&request).await.unwrap();
        let received = server_rx.recv().await.unwrap();
        assert_eq!(received.source.as_deref(), Some("phone-1"));
    }
}
