use std::sync::Arc;
use std::time::Instant;

use redb::Database;

use crate::cart::{CartRegistry, Checkout};
use crate::catalog::CatalogService;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result, ServerError};
use crate::customers::CustomerStorage;
use crate::db;
use crate::message::MessageBus;
use crate::mirror::Mirror;
use crate::orders::{OrderStorage, RetryPolicy, TableOrderManager};
use crate::sales::{SaleSink, SalesStorage};

/// 服务器状态 - 持有所有服务的共享引用
///
/// Clone 是浅拷贝 (Arc)，作为 axum State 传给每个 handler。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | redb 数据库句柄 |
/// | orders | 桌台订单管理器 |
/// | mirror | 桌台状态广播 |
/// | message_bus | 消息总线 |
/// | catalog | 菜单 (内存缓存) |
/// | sales | 销售记录 |
/// | customers | 挂账客户 |
/// | carts | 各终端购物车 |
/// | checkout | 桌台结账 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub db: Arc<Database>,
    pub orders: Arc<TableOrderManager>,
    pub mirror: Arc<Mirror>,
    pub message_bus: MessageBus,
    pub catalog: Arc<CatalogService>,
    pub sales: Arc<SalesStorage>,
    pub customers: Arc<CustomerStorage>,
    pub carts: Arc<CartRegistry>,
    pub checkout: Arc<Checkout>,
    pub retry: RetryPolicy,
    started_at: Instant,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/cafe.redb)
    /// 3. 各服务
    /// 4. 菜单种子导入 + 缓存预热
    pub fn initialize(config: &Config) -> Result<Self> {
        config
            .ensure_work_dir_structure()
            .map_err(ServerError::WorkDir)?;

        let db = db::open(config.database_path())?;
        let state = Self::from_database(config.clone(), db)?;

        state.catalog.import_seed_file(config.catalog_seed_path())?;
        state.catalog.warmup()?;
        Ok(state)
    }

    /// Wire every service onto an already opened database
    pub fn from_database(config: Config, db: Arc<Database>) -> Result<Self> {
        let order_store = Arc::new(OrderStorage::new(db.clone())?);
        let orders = Arc::new(TableOrderManager::new(order_store, config.table_count));
        let message_bus = MessageBus::from_config(config.transport_config());
        let mirror = Arc::new(Mirror::new(
            orders.clone(),
            message_bus.clone(),
            config.mirror_config(),
        ));

        let sales = Arc::new(SalesStorage::new(db.clone())?);
        let customers = Arc::new(CustomerStorage::new(db.clone())?);
        let catalog = Arc::new(CatalogService::new(db.clone())?);

        let retry = config.retry_policy();
        let sink: Arc<dyn SaleSink> = sales.clone();
        let checkout = Arc::new(Checkout::new(orders.clone(), sink, retry));

        tracing::info!(
            tables = config.table_count,
            resync_secs = config.mirror_resync_secs,
            "Server state initialized"
        );

        Ok(Self {
            config,
            db,
            orders,
            mirror,
            message_bus,
            catalog,
            sales,
            customers,
            carts: Arc::new(CartRegistry::new()),
            checkout,
            retry,
            started_at: Instant::now(),
        })
    }

    /// In-memory state for tests
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::from_database(config, db::open_in_memory()?)
    }

    /// 启动后台任务
    ///
    /// - `table_mirror`: 事件广播、观察端快照、周期同步
    /// - `message_bus_tcp`: 观察端 TCP 接入
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::with_token(self.message_bus.shutdown_token().clone());

        let mirror = self.mirror.clone();
        let token = tasks.shutdown_token();
        tasks.spawn("table_mirror", TaskKind::Worker, mirror.run(token));

        let bus = self.message_bus.clone();
        tasks.spawn("message_bus_tcp", TaskKind::Listener, async move {
            if let Err(e) = bus.start_tcp_server().await {
                tracing::error!(error = %e, "Message bus TCP server failed");
            }
        });

        tasks.log_summary();
        tasks
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
