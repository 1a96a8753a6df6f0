use crate::catalog::CatalogError;
use crate::db::StorageError;
use shared::error::AppError;
use thiserror::Error;

/// 启动和运行期错误 (不经过 HTTP)
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("工作目录不可用: {0}")]
    WorkDir(#[source] std::io::Error),

    #[error("数据库初始化失败: {0}")]
    Storage(#[from] StorageError),

    #[error("菜单加载失败: {0}")]
    Catalog(#[from] CatalogError),

    #[error("端口绑定失败 {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP 服务异常: {0}")]
    Http(#[source] std::io::Error),

    #[error(transparent)]
    App(#[from] AppError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
