use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::CATALOG_SEED_FILE;
use crate::db::DATABASE_FILE;
use crate::message::TransportConfig;
use crate::mirror::MirrorConfig;
use crate::orders::RetryPolicy;

/// 服务器配置 - 边缘节点的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/cafe/edge | 工作目录 (数据库、日志、菜单种子) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | MESSAGE_TCP_PORT | 8081 | TCP 消息总线端口 |
/// | TABLE_COUNT | 50 | 桌台数量 (桌号 1..=N) |
/// | MIRROR_RESYNC_SECS | 30 | 镜像周期性全量同步间隔 |
/// | ORDER_RETRY_ATTEMPTS | 3 | 送单最大尝试次数 |
/// | ORDER_RETRY_BACKOFF_MS | 200 | 首次重试等待 (之后翻倍) |
/// | ORDER_SUBMIT_TIMEOUT_MS | 10000 | 送单总超时 |
/// | LOG_LEVEL | info | 日志级别 (RUST_LOG 优先) |
/// | LOG_JSON | false | JSON 格式日志 |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/cafe TABLE_COUNT=20 cargo run
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// TCP 消息总线端口 (观察端直连)
    pub message_tcp_port: u16,
    pub table_count: u32,
    pub mirror_resync_secs: u64,
    pub order_retry_attempts: u32,
    pub order_retry_backoff_ms: u64,
    pub order_submit_timeout_ms: u64,
    pub log_level: String,
    pub log_json: bool,
    /// 运行环境: development | staging | production
    pub environment: String,
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key = %key, value = %raw, "Invalid config value, using default");
                default
            }
        },
        None => default,
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable keys take their default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            work_dir: lookup("WORK_DIR").unwrap_or_else(|| "/var/lib/cafe/edge".into()),
            http_port: parsed(&lookup, "HTTP_PORT", 3000),
            message_tcp_port: parsed(&lookup, "MESSAGE_TCP_PORT", 8081),
            table_count: parsed(&lookup, "TABLE_COUNT", 50u32).max(1),
            mirror_resync_secs: parsed(&lookup, "MIRROR_RESYNC_SECS", 30u64).max(1),
            order_retry_attempts: parsed(&lookup, "ORDER_RETRY_ATTEMPTS", 3u32).max(1),
            order_retry_backoff_ms: parsed(&lookup, "ORDER_RETRY_BACKOFF_MS", 200),
            order_submit_timeout_ms: parsed(&lookup, "ORDER_SUBMIT_TIMEOUT_MS", 10_000),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: parsed(&lookup, "LOG_JSON", false),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".into()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(
        work_dir: impl Into<String>,
        http_port: u16,
        message_tcp_port: u16,
    ) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.message_tcp_port = message_tcp_port;
        config
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
    }

    /// work_dir/cafe.redb
    pub fn database_path(&self) -> PathBuf {
        self.work_dir().join(DATABASE_FILE)
    }

    /// work_dir/logs
    pub fn log_dir(&self) -> PathBuf {
        self.work_dir().join("logs")
    }

    /// work_dir/catalog.json
    pub fn catalog_seed_path(&self) -> PathBuf {
        self.work_dir().join(CATALOG_SEED_FILE)
    }

    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.work_dir())?;
        std::fs::create_dir_all(self.log_dir())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.order_retry_attempts,
            Duration::from_millis(self.order_retry_backoff_ms),
            Duration::from_millis(self.order_submit_timeout_ms),
        )
    }

    pub fn mirror_config(&self) -> MirrorConfig {
        MirrorConfig {
            resync_interval: Duration::from_secs(self.mirror_resync_secs),
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            tcp_listen_addr: format!("0.0.0.0:{}", self.message_tcp_port),
            ..Default::default()
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
