//! 错误类型

use thiserror::Error;

/// 远程存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 对象被锁定，无法计算校验和
    #[error("数据对象被锁定: {0}")]
    Locked(String),

    /// 父集合不存在
    #[error("父集合不存在: {0}")]
    ParentMissing(String),

    #[error("传输失败: {0}")]
    Transfer(String),

    #[error("存储后端错误: {0}")]
    Backend(#[from] opendal::Error),

    #[error("元数据目录错误: {0}")]
    Catalog(#[from] sqlx::Error),

    #[error("元数据目录迁移失败: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 同步引擎错误
#[derive(Debug, Error)]
pub enum SyncError {
    /// 配置错误（例如不支持的校验方式）
    #[error("配置错误: {0}")]
    Config(String),

    /// 无法建立集合结构，整个同步中止
    #[error("创建集合 {collection} 失败: {source}")]
    Structural {
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error("扫描本地目录失败: {0}")]
    Scan(String),

    #[error("读写同步报告失败: {0}")]
    Report(String),

    /// 收到中断信号，已处理的文件已写入报告
    #[error("同步被中断")]
    Interrupted,
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Report(e.to_string())
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
