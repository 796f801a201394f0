use std::path::PathBuf;

pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod store;

pub use crate::core::{RunReport, SyncEngine, SyncOptions, VerificationMethod};
pub use error::{StoreError, SyncError};
pub use store::{CollectionStore, StoreConfig, StoreType};

use store::{AvuCatalog, OpendalStore};

/// 一次调用期间独占的存储会话
///
/// 由命令层打开并传给引擎，结束后必须调用 `close`。
pub struct Session {
    store: OpendalStore,
}

impl Session {
    pub async fn open(config: &StoreConfig) -> anyhow::Result<Self> {
        let (operator, name) = store::build_operator(config)?;

        let catalog_path = config
            .catalog
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| crate::config::app_config_dir().join("catalog.db"));
        if let Some(parent) = catalog_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Windows 路径需要转换反斜杠为正斜杠
        let catalog_str = catalog_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid catalog path"))?
            .replace('\\', "/");
        let catalog = AvuCatalog::open(&format!("sqlite:{}?mode=rwc", catalog_str)).await?;

        tracing::debug!("会话已建立: {}", name);
        Ok(Self {
            store: OpendalStore::new(operator, catalog, name),
        })
    }

    pub fn store(&self) -> &dyn CollectionStore {
        &self.store
    }

    /// 释放资源
    pub async fn close(self) {
        tracing::debug!("关闭会话: {}", self.store.name());
        self.store.catalog().close().await;
    }
}

pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }
}
