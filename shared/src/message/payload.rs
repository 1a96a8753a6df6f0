use crate::order::{TableEvent, TableOrder};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==================== Notification Level ====================

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ==================== Payloads ====================

/// 握手载荷 (观察端 -> 边缘服务端)
///
/// 包含客户端的协议版本信息，用于服务端进行版本校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// 协议版本
    pub version: u16,
    /// 客户端名称/标识, e.g. "waiter-phone"
    pub client_name: Option<String>,
    pub client_version: Option<String>,
    /// 客户端唯一标识 (UUID)，缺省时由服务端分配
    pub client_id: Option<String>,
}

/// 通知载荷 (服务端 -> 观察端)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
}

impl NotificationPayload {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Info,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Warning,
        }
    }
}

/// 响应载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub success: bool,
    pub message: String,
    /// 错误码 (失败时)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ResponsePayload {
    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: None,
            data,
        }
    }

    pub fn error(message: impl Into<String>, error_code: Option<u16>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_code,
            data: None,
        }
    }
}

/// Why a full snapshot was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotReason {
    /// 新观察端连接
    Connect,
    /// 定时全量同步
    Periodic,
    /// 事件通道滞后，可能丢失事件
    Lagged,
    /// 观察端主动请求
    Requested,
}

impl fmt::Display for SnapshotReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Periodic => write!(f, "periodic"),
            Self::Lagged => write!(f, "lagged"),
            Self::Requested => write!(f, "requested"),
        }
    }
}

/// 桌台镜像载荷 (TableSync)
///
/// `sequence` increases by one per published event. A snapshot carries the
/// sequence of the last event it already includes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MirrorPayload {
    Event {
        sequence: u64,
        event: TableEvent,
    },
    Snapshot {
        sequence: u64,
        reason: SnapshotReason,
        orders: Vec<TableOrder>,
    },
}

impl MirrorPayload {
    pub fn sequence(&self) -> u64 {
        match self {
            Self::Event { sequence, .. } | Self::Snapshot { sequence, .. } => *sequence,
        }
    }
}

/// 同步请求载荷 (观察端 -> 服务端)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSyncPayload {
    /// Last sequence the observer applied, for diagnostics
    #[serde(default)]
    pub last_sequence: u64,
}
