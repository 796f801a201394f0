use crate::config::load_store_config;
use crate::Session;
use std::path::Path;
use tracing::info;

/// 删除对象或集合（含子孙）上的全部元数据，返回删除条数
pub async fn clear_metadata(config_file: &Path, path: &str) -> anyhow::Result<u64> {
    let store_config = load_store_config(config_file)?;
    let session = Session::open(&store_config).await?;

    let result = session.store().remove_metadata(path).await;
    session.close().await;

    let removed = result?;
    info!("已删除 {} 条元数据: {}", removed, path);
    Ok(removed)
}
