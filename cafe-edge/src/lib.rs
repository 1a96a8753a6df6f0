//! Cafe Edge - 咖啡店收银边缘节点
//!
//! # 架构概述
//!
//! - **桌台订单** (`orders`): 每桌一张在用订单，逐桌加锁，事件广播
//! - **镜像** (`mirror`): 把桌台事件和快照推给观察端
//! - **消息总线** (`message`): TCP/Memory 传输的帧消息系统
//! - **收银** (`cart`): 购物车、支付、桌台结账
//! - **存储** (`db`, `sales`, `customers`, `catalog`): 嵌入式 redb
//! - **HTTP API** (`api`): axum 路由
//!
//! # 模块结构
//!
//! ```text
//! cafe-edge/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── api/           # HTTP 路由和处理器
//! ├── orders/        # 桌台订单存储与管理
//! ├── mirror/        # 桌台状态广播
//! ├── message/       # 消息总线
//! ├── cart/          # 购物车与结账
//! ├── catalog/       # 菜单
//! ├── sales/         # 销售记录
//! ├── customers/     # 挂账客户
//! ├── db/            # redb 打开与错误
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod cart;
pub mod catalog;
pub mod core;
pub mod customers;
pub mod db;
pub mod message;
pub mod mirror;
pub mod orders;
pub mod sales;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerState};
pub use message::{BusMessage, EventType, MessageBus, ObserverClient};
pub use mirror::Mirror;
pub use orders::{OrderStorage, TableOrderManager};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Keep rolled log files this many days
pub const LOG_RETENTION_DAYS: u64 = 14;

/// 设置运行环境: dotenv, 工作目录, 日志
///
/// Returns the log file guard; hold it until the process exits.
pub fn setup_environment(
    config: &Config,
) -> std::io::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    config.ensure_work_dir_structure()?;
    let log_dir = config.log_dir();
    let guard = init_logger_with_file(Some(config.log_level.as_str()), config.log_json, Some(log_dir.as_path()));
    if let Err(e) = cleanup_old_logs(&log_dir, LOG_RETENTION_DAYS) {
        tracing::warn!(error = %e, "Log cleanup failed");
    }
    Ok(guard)
}

pub fn print_banner() {
    println!(
        r#"
   ______       ____        ______    __
  / ____/___ _ / __/__     / ____/___/ /___ ____
 / /   / __ `// /_/ _ \   / __/ / __  / __ `/ _ \
/ /___/ /_/ // __/  __/  / /___/ /_/ / /_/ /  __/
\____/\__,_//_/  \___/  /_____/\__,_/\__, /\___/
                                    /____/
    "#
    );
}
