//! 消息总线消息类型定义
//!
//! 这些类型在 cafe-edge 和观察端之间共享，用于
//! 进程内（内存）和网络（TCP）通信。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// 消息总线事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 握手消息
    Handshake = 0,
    /// 系统通知
    Notification = 1,
    /// 桌台镜像 (事件或全量快照)
    TableSync = 2,
    /// 观察端请求全量快照
    RequestSync = 3,
    /// 请求响应
    Response = 4,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Handshake),
            1 => Ok(EventType::Notification),
            2 => Ok(EventType::TableSync),
            3 => Ok(EventType::RequestSync),
            4 => Ok(EventType::Response),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Handshake => write!(f, "handshake"),
            EventType::Notification => write!(f, "notification"),
            EventType::TableSync => write!(f, "table_sync"),
            EventType::RequestSync => write!(f, "request_sync"),
            EventType::Response => write!(f, "response"),
        }
    }
}

/// 消息总线消息体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    /// 发送方客户端 ID (由服务端在读取时注入)
    pub source: Option<String>,
    pub correlation_id: Option<Uuid>,
    /// 目标客户端 ID，None 表示广播
    pub target: Option<String>,
    /// 广播时跳过的客户端 ID (不回显给发起方)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            source: None,
            correlation_id: None,
            target: None,
            exclude: None,
            payload,
        }
    }

    /// 序列化载荷并创建消息
    pub fn encode<T: Serialize>(event_type: EventType, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event_type, serde_json::to_vec(payload)?))
    }

    /// 设置目标客户端
    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// 广播但跳过指定客户端
    pub fn with_exclude(mut self, client_id: &str) -> Self {
        self.exclude = Some(client_id.to_string());
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    /// 设置关联 ID (用于响应)
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// 创建握手消息
    pub fn handshake(payload: &HandshakePayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Handshake, payload)
    }

    /// 创建通知消息
    pub fn notification(payload: &NotificationPayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Notification, payload)
    }

    /// 创建桌台镜像消息
    pub fn table_sync(payload: &MirrorPayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::TableSync, payload)
    }

    /// 创建同步请求消息
    pub fn request_sync(payload: &RequestSyncPayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::RequestSync, payload)
    }

    /// 创建响应消息
    pub fn response(payload: &ResponsePayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Response, payload)
    }

    /// 解析载荷为指定类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// 是否发给指定客户端 (广播消息对除 exclude 以外的所有客户端可见)
    pub fn is_for(&self, client_id: &str) -> bool {
        if self.exclude.as_deref() == Some(client_id) {
            return false;
        }
        self.target.as_deref().is_none_or(|t| t == client_id)
    }
}
