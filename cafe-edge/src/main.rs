use anyhow::Context;
use cafe_edge::{Config, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. .env 优先于默认值
    dotenv::dotenv().ok();

    // 2. 加载配置
    let config = Config::from_env();

    // 3. 设置环境 (工作目录, 日志)
    let _log_guard = setup_environment(&config).context("failed to prepare work dir")?;

    print_banner();
    tracing::info!(
        work_dir = %config.work_dir,
        environment = %config.environment,
        "☕ Cafe Edge starting..."
    );

    // 4. 初始化服务器状态
    let state = ServerState::initialize(&config).context("failed to initialize server state")?;

    // 5. 启动 HTTP 服务器 (Server::run 会启动后台任务)
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
