use crate::config::load_store_config;
use crate::store::Lookup;
use crate::Session;
use std::path::Path;
use tracing::{info, warn};

/// 连接测试结果
#[derive(Debug)]
pub struct CheckResult {
    pub success: bool,
    pub message: String,
}

/// 打开会话并确认集合可访问
pub async fn check_connection(
    config_file: &Path,
    collection: Option<&str>,
) -> anyhow::Result<CheckResult> {
    let store_config = load_store_config(config_file)?;
    let collection = collection.unwrap_or("/");

    let session = match Session::open(&store_config).await {
        Ok(s) => s,
        Err(e) => {
            warn!("连接存储失败: {}", e);
            return Ok(CheckResult {
                success: false,
                message: format!("无法连接存储: {}", e),
            });
        }
    };

    let name = session.store().name().to_string();
    let lookup = session.store().get_collection(collection).await;
    session.close().await;

    let result = match lookup {
        Lookup::Found(()) => CheckResult {
            success: true,
            message: format!("成功连接 {}，集合 {} 可访问", name, collection),
        },
        Lookup::NotFound => CheckResult {
            success: false,
            message: format!("已连接 {}，但集合 {} 不存在", name, collection),
        },
        Lookup::Error(e) => CheckResult {
            success: false,
            message: format!("访问集合 {} 失败: {}", collection, e),
        },
    };

    info!("{}", result.message);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path) -> std::path::PathBuf {
        let file = dir.join("config.json");
        let config = serde_json::json!({
            "store": {
                "type": "local",
                "path": dir.join("store").to_string_lossy(),
                "catalog": dir.join("catalog.db").to_string_lossy(),
            }
        });
        std::fs::write(&file, config.to_string()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_check_existing_and_missing_collection() {
        let dir = TempDir::new().unwrap();
        let file = write_config(dir.path());
        std::fs::create_dir_all(dir.path().join("store/zone/home")).unwrap();

        assert!(check_connection(&file, None).await.unwrap().success);
        assert!(check_connection(&file, Some("/zone/home")).await.unwrap().success);
        assert!(!check_connection(&file, Some("/zone/other")).await.unwrap().success);
    }
}
