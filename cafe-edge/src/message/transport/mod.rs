//! Transport 传输层抽象
//!
//! ```text
//!         ┌────────────────────┐
//!         │   Transport Trait  │  ◄── 可插拔接口
//!         └────────┬───────────┘
//!                  │
//!          ┌───────┴────────┐
//!          ▼                ▼
//!    TcpTransport     MemoryTransport
//!    (TCP 协议)        (同进程通信)
//! ```
//!
//! # 帧格式
//!
//! ```text
//! ┌──────┬────────────┬────────────────┬──────────┬─────────────┐
//! │ type │ request_id │ correlation_id │ len (LE) │ payload     │
//! │ 1 B  │ 16 B       │ 16 B (nil=无)  │ 4 B      │ len B, JSON │
//! └──────┴────────────┴────────────────┴──────────┴─────────────┘
//! ```
//!
//! `source`, `target` and `exclude` are routing fields of the edge node and
//! never travel on the wire.

mod memory;
mod tcp;

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::message::{BusMessage, EventType};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

/// Fixed header size: type + request id + correlation id + length
pub const FRAME_HEADER_LEN: usize = 1 + 16 + 16 + 4;

/// Largest payload accepted from a peer (a full snapshot of 50 tables fits easily)
pub const MAX_PAYLOAD_LEN: usize = 8 * 1024 * 1024;

/// Transport 传输层特征
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// 从传输层读取一条消息
    async fn read_message(&self) -> Result<BusMessage, AppError>;

    /// 向传输层写入一条消息
    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError>;

    /// 关闭传输连接
    async fn close(&self) -> Result<(), AppError>;

    /// 获取对端地址
    fn peer_addr(&self) -> Option<String> {
        None
    }
}

// ========== 辅助函数 ==========

fn disconnected() -> AppError {
    AppError::new(ErrorCode::ClientDisconnected)
}

/// 从异步流中读取 BusMessage
pub(crate) async fn read_from_stream<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<BusMessage, AppError> {
    // 事件类型 (1 字节)，此处 EOF 视为正常断开
    let mut type_buf = [0u8; 1];
    match reader.read_exact(&mut type_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(disconnected()),
        Err(e) => return Err(AppError::with_message(ErrorCode::NetworkError, format!("Read type failed: {}", e))),
    }

    let event_type = EventType::try_from(type_buf[0]).map_err(|_| {
        AppError::with_message(
            ErrorCode::InvalidFormat,
            format!("Invalid event type: {}", type_buf[0]),
        )
    })?;

    let mut uuid_buf = [0u8; 16];
    reader
        .read_exact(&mut uuid_buf)
        .await
        .map_err(|e| AppError::with_message(ErrorCode::NetworkError, format!("Read UUID failed: {}", e)))?;
    let request_id = Uuid::from_bytes(uuid_buf);

    let mut correlation_buf = [0u8; 16];
    reader.read_exact(&mut correlation_buf).await.map_err(|e| {
        AppError::with_message(
            ErrorCode::NetworkError,
            format!("Read correlation UUID failed: {}", e),
        )
    })?;
    let correlation_id = Some(Uuid::from_bytes(correlation_buf)).filter(|id| !id.is_nil());

    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| AppError::with_message(ErrorCode::NetworkError, format!("Read len failed: {}", e)))?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("Frame payload too large: {} bytes", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| AppError::with_message(ErrorCode::NetworkError, format!("Read payload failed: {}", e)))?;

    Ok(BusMessage {
        request_id,
        event_type,
        source: None,
        correlation_id,
        target: None,
        exclude: None,
        payload,
    })
}

/// Encode one frame
pub(crate) fn encode_frame(msg: &BusMessage) -> Vec<u8> {
    let mut data = Vec::with_capacity(FRAME_HEADER_LEN + msg.payload.len());
    data.push(msg.event_type as u8);
    data.extend_from_slice(msg.request_id.as_bytes());
    // nil UUID = no correlation
    data.extend_from_slice(msg.correlation_id.unwrap_or(Uuid::nil()).as_bytes());
    data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&msg.payload);
    data
}

/// 向异步流写入 BusMessage
pub(crate) async fn write_to_stream<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), AppError> {
    writer
        .write_all(&encode_frame(msg))
        .await
        .map_err(|e| AppError::with_message(ErrorCode::NetworkError, format!("Write failed: {}", e)))?;
    Ok(())
}
