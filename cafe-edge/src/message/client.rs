//! Observer client
//!
//! A TCP observer of the edge node (phone, second screen). It performs the
//! handshake, then folds every `TableSync` frame into a local [`MirrorView`].
//! When it notices a sequence gap it asks the mirror for a fresh snapshot.
//!
//! The view is a cache of the edge node's state and is never authoritative.

use std::sync::Arc;
use std::time::Duration;

use shared::error::{AppError, ErrorCode};
use shared::message::{
    BusMessage, EventType, HandshakePayload, MirrorPayload, PROTOCOL_VERSION, RequestSyncPayload,
    ResponsePayload,
};
use shared::order::{ApplyOutcome, MirrorView};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::transport::{TcpTransport, Transport};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct ObserverClient {
    client_id: String,
    transport: Arc<TcpTransport>,
    view: watch::Receiver<MirrorView>,
    reader: JoinHandle<()>,
}

impl ObserverClient {
    /// Connect and let the server assign the client id
    pub async fn connect(addr: &str, client_name: &str) -> Result<Self, AppError> {
        Self::connect_as(addr, client_name, None).await
    }

    /// Connect with an explicit client id
    pub async fn connect_as(
        addr: &str,
        client_name: &str,
        client_id: Option<&str>,
    ) -> Result<Self, AppError> {
        let transport = Arc::new(TcpTransport::connect(addr).await?);

        let handshake = BusMessage::handshake(&HandshakePayload {
            version: PROTOCOL_VERSION,
            client_name: Some(client_name.to_string()),
            client_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            client_id: client_id.map(str::to_string),
        })
        .map_err(|e| AppError::internal(e.to_string()))?;
        transport.write_message(&handshake).await?;

        let response = tokio::time::timeout(HANDSHAKE_TIMEOUT, transport.read_message())
            .await
            .map_err(|_| AppError::with_message(ErrorCode::TimeoutError, "Handshake timed out"))??;
        if response.event_type != EventType::Response
            || response.correlation_id != Some(handshake.request_id)
        {
            return Err(AppError::with_message(
                ErrorCode::InvalidFormat,
                format!("Unexpected handshake reply: {}", response.event_type),
            ));
        }
        let reply: ResponsePayload = response.parse_payload().map_err(|e| {
            AppError::with_message(ErrorCode::InvalidFormat, format!("Invalid handshake reply: {}", e))
        })?;
        if !reply.success {
            return Err(AppError::with_message(ErrorCode::InvalidRequest, reply.message));
        }

        let assigned = reply
            .data
            .as_ref()
            .and_then(|d| d.get("client_id"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| client_id.map(str::to_string))
            .ok_or_else(|| AppError::with_message(ErrorCode::InvalidFormat, "Handshake reply without client id"))?;

        let (view_tx, view) = watch::channel(MirrorView::new());
        let reader = tokio::spawn(read_loop(transport.clone(), view_tx, assigned.clone()));

        tracing::debug!(client_id = %assigned, "Observer client connected");
        Ok(Self {
            client_id: assigned,
            transport,
            view,
            reader,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Current local view
    pub fn view(&self) -> MirrorView {
        self.view.borrow().clone()
    }

    /// Wait until the view satisfies `pred`; false on timeout or disconnect
    pub async fn wait_until<F>(&self, timeout: Duration, pred: F) -> bool
    where
        F: Fn(&MirrorView) -> bool,
    {
        let mut rx = self.view.clone();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|v| pred(v))).await,
            Ok(Ok(_))
        )
    }

    /// Ask the mirror for a full snapshot
    pub async fn request_sync(&self) -> Result<(), AppError> {
        let last_sequence = self.view.borrow().last_sequence();
        send_request_sync(&*self.transport, last_sequence).await
    }

    pub async fn close(&self) -> Result<(), AppError> {
        self.reader.abort();
        self.transport.close().await
    }
}

impl Drop for ObserverClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn send_request_sync(transport: &dyn Transport, last_sequence: u64) -> Result<(), AppError> {
    let msg = BusMessage::request_sync(&RequestSyncPayload { last_sequence })
        .map_err(|e| AppError::internal(e.to_string()))?;
    transport.write_message(&msg).await
}

async fn read_loop(
    transport: Arc<TcpTransport>,
    view_tx: watch::Sender<MirrorView>,
    client_id: String,
) {
    loop {
        let msg = match transport.read_message().await {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(client_id = %client_id, "Observer read loop ended: {}", e);
                break;
            }
        };

        match msg.event_type {
            EventType::TableSync => {
                let payload: MirrorPayload = match msg.parse_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(client_id = %client_id, "Invalid table sync payload: {}", e);
                        continue;
                    }
                };
                let mut outcome = ApplyOutcome::Stale;
                view_tx.send_modify(|view| outcome = view.apply_payload(&payload));
                if outcome == ApplyOutcome::Gap {
                    tracing::debug!(client_id = %client_id, sequence = payload.sequence(), "Sequence gap, requesting snapshot");
                    if let Err(e) = send_request_sync(&*transport, payload.sequence()).await {
                        tracing::debug!(client_id = %client_id, "Failed to request snapshot: {}", e);
                        break;
                    }
                }
            }
            other => {
                tracing::trace!(client_id = %client_id, event_type = %other, "Ignoring message");
            }
        }
    }
}
