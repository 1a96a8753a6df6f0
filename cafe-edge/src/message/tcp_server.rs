//! TCP 服务器实现
//!
//! 负责处理观察端连接，包括：
//! - 监听连接
//! - 协议握手验证
//! - 消息转发 (server_tx → 客户端，客户端 → client_tx)
//!
//! A successful handshake is re-published on `client_tx` with `source` set to
//! the client id. The mirror listens for it and answers with a snapshot. The
//! forwarder is subscribed before that notice goes out, so the snapshot
//! cannot be missed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use shared::error::{AppError, ErrorCode};
use shared::message::{
    BusMessage, EventType, HandshakePayload, PROTOCOL_VERSION, RequestSyncPayload,
    ResponsePayload,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::bus::MessageBus;
use super::transport::{TcpTransport, Transport};

/// Pause after a handshake rejection so the reply reaches the client before the close
const HANDSHAKE_ERROR_DELAY: Duration = Duration::from_millis(100);

impl MessageBus {
    /// Bind the configured address and serve observers until shutdown
    pub async fn start_tcp_server(&self) -> Result<(), AppError> {
        let listener = TcpListener::bind(&self.config.tcp_listen_addr)
            .await
            .map_err(|e| {
                AppError::with_message(
                    ErrorCode::NetworkError,
                    format!("Failed to bind {}: {}", self.config.tcp_listen_addr, e),
                )
            })?;
        tracing::info!(addr = %self.config.tcp_listen_addr, "Message bus TCP server listening");
        self.serve(listener).await
    }

    /// Accept loop on an already bound listener (tests bind port 0)
    pub async fn serve(&self, listener: TcpListener) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = self.shutdown_token().cancelled() => {
                    tracing::info!("Message bus TCP server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Client connected: {}", addr);
                            self.spawn_client_handler(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn spawn_client_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let links = Links {
            server_tx: self.sender().clone(),
            client_tx: self.sender_to_server().clone(),
            shutdown: self.shutdown_token().clone(),
        };
        let clients = self.clients.clone();

        tokio::spawn(async move {
            if let Err(e) = serve_observer(stream, addr, links, clients).await {
                tracing::debug!("Client {} handler finished: {}", addr, e);
            }
        });
    }
}

/// Bus channels a connection is wired to
#[derive(Clone)]
struct Links {
    server_tx: broadcast::Sender<BusMessage>,
    client_tx: broadcast::Sender<BusMessage>,
    shutdown: CancellationToken,
}

/// One handshaken observer
struct ObserverConnection {
    transport: Arc<dyn Transport>,
    client_id: String,
    addr: SocketAddr,
    links: Links,
    /// Set by the reader once the socket is gone, stops the forwarder
    disconnected: CancellationToken,
}

async fn serve_observer(
    stream: TcpStream,
    addr: SocketAddr,
    links: Links,
    clients: Arc<DashMap<String, Arc<dyn Transport>>>,
) -> Result<(), AppError> {
    let transport: Arc<dyn Transport> = Arc::new(TcpTransport::from_stream(stream));
    let (handshake, client_id) = perform_handshake(&transport, addr).await?;

    clients.insert(client_id.clone(), transport.clone());
    tracing::info!(client_id = %client_id, addr = %addr, "Observer connected");

    let conn = Arc::new(ObserverConnection {
        transport,
        client_id,
        addr,
        links,
        disconnected: CancellationToken::new(),
    });

    // subscribe before announcing the client so the connect snapshot is seen
    let forwarder = tokio::spawn(conn.clone().forward(conn.links.server_tx.subscribe()));

    let mut notice = handshake;
    notice.source = Some(conn.client_id.clone());
    if let Err(e) = conn.links.client_tx.send(notice) {
        tracing::warn!(client_id = %conn.client_id, "Failed to announce observer: {}", e);
    }

    conn.read_requests().await;

    forwarder.abort();
    let _ = conn.transport.close().await;
    clients.remove(&conn.client_id);
    tracing::info!(client_id = %conn.client_id, "Observer disconnected");

    Ok(())
}

/// Returns the handshake message and the client id
async fn perform_handshake(
    transport: &Arc<dyn Transport>,
    addr: SocketAddr,
) -> Result<(BusMessage, String), AppError> {
    tracing::debug!("Waiting for handshake from {}", addr);

    let msg = transport.read_message().await.map_err(|e| {
        tracing::warn!("Client {} handshake error: {}", addr, e);
        e
    })?;

    if msg.event_type != EventType::Handshake {
        tracing::warn!(addr = %addr, got = %msg.event_type, "First frame was not a handshake");
        return Err(reject(transport, &msg, "Expected Handshake message").await);
    }

    let payload: HandshakePayload = match msg.parse_payload() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Client {} sent invalid handshake payload: {}", addr, e);
            return Err(reject(transport, &msg, &format!("Invalid handshake payload: {}", e)).await);
        }
    };

    if payload.version != PROTOCOL_VERSION {
        tracing::warn!(
            addr = %addr,
            server = PROTOCOL_VERSION,
            client = payload.version,
            "Protocol version mismatch"
        );
        let reason = format!(
            "Protocol version mismatch: server={}, client={}",
            PROTOCOL_VERSION, payload.version
        );
        return Err(reject(transport, &msg, &reason).await);
    }

    let client_id = payload
        .client_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    tracing::debug!(
        addr = %addr,
        client_id = %client_id,
        client_name = ?payload.client_name,
        "Handshake accepted"
    );

    let response = ResponsePayload::success(
        format!("Connected as client: {}", client_id),
        Some(serde_json::json!({ "client_id": client_id })),
    );
    let response = BusMessage::response(&response)
        .map_err(|e| AppError::internal(e.to_string()))?
        .with_correlation_id(msg.request_id);
    transport.write_message(&response).await?;

    Ok((msg, client_id))
}

/// Answer a bad handshake, give the client a moment to read it, return the error
async fn reject(transport: &Arc<dyn Transport>, msg: &BusMessage, reason: &str) -> AppError {
    let payload = ResponsePayload::error(reason, Some(ErrorCode::InvalidRequest.code()));
    match BusMessage::response(&payload) {
        Ok(response) => {
            let response = response.with_correlation_id(msg.request_id);
            if let Err(e) = transport.write_message(&response).await {
                tracing::error!("Failed to send handshake error: {}", e);
            }
        }
        Err(e) => tracing::error!("Failed to encode handshake error: {}", e),
    }

    tokio::time::sleep(HANDSHAKE_ERROR_DELAY).await;
    AppError::invalid_request(reason)
}

impl ObserverConnection {
    /// server_tx → socket, honouring target / exclude
    async fn forward(self: Arc<Self>, mut rx: broadcast::Receiver<BusMessage>) {
        let id = self.client_id.as_str();
        loop {
            let received = tokio::select! {
                _ = self.links.shutdown.cancelled() => break,
                _ = self.disconnected.cancelled() => break,
                received = rx.recv() => received,
            };

            match received {
                Ok(msg) if msg.is_for(id) => {
                    if let Err(e) = self.transport.write_message(&msg).await {
                        tracing::debug!(client_id = %id, "Client write failed: {}", e);
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // events were dropped for this client; a snapshot replaces them
                    tracing::warn!(client_id = %id, dropped_messages = n, "Client lagged behind, requesting resync");
                    self.publish_resync();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        tracing::debug!(client_id = %id, "Client forwarder stopped");
    }

    fn publish_resync(&self) {
        match BusMessage::request_sync(&RequestSyncPayload::default()) {
            Ok(request) => {
                let _ = self.links.client_tx.send(request.with_source(&self.client_id));
            }
            Err(e) => tracing::error!("Failed to encode resync request: {}", e),
        }
    }

    /// socket → client_tx. Observers may only ask for snapshots.
    async fn read_requests(&self) {
        loop {
            let read = tokio::select! {
                _ = self.links.shutdown.cancelled() => break,
                read = self.transport.read_message() => read,
            };

            match read {
                Ok(mut msg) if msg.event_type == EventType::RequestSync => {
                    msg.source = Some(self.client_id.clone());
                    if let Err(e) = self.links.client_tx.send(msg) {
                        tracing::warn!("Failed to publish client message: {}", e);
                    }
                }
                Ok(msg) => {
                    tracing::warn!(
                        target: "security",
                        client_id = %self.client_id,
                        client_addr = %self.addr,
                        event_type = %msg.event_type,
                        "Observer sent a message it is not allowed to send, dropping"
                    );
                }
                Err(e) => {
                    if e.code == ErrorCode::ClientDisconnected {
                        tracing::debug!(client_id = %self.client_id, "Client {} disconnected", self.addr);
                    } else {
                        tracing::debug!(client_id = %self.client_id, "Client {} read error: {}", self.addr, e);
                    }
                    self.disconnected.cancel();
                    break;
                }
            }
        }
    }
}
