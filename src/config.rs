//! 应用配置模块
//!
//! 所有配置都在一个 `config.json` 里，按段读取：`store`、`sync`、`log`。

use crate::store::StoreConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// 配置文件名
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 同步默认值（命令行参数优先）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDefaults {
    #[serde(default = "default_verification_method")]
    pub verification_method: String,
    #[serde(default)]
    pub post_check: bool,
    #[serde(default)]
    pub preserve_mtime: bool,
    /// 同步报告目录，缺省为当前目录
    #[serde(default)]
    pub report_dir: Option<String>,
}

fn default_verification_method() -> String {
    "size".to_string()
}

impl Default for SyncDefaults {
    fn default() -> Self {
        Self {
            verification_method: default_verification_method(),
            post_check: false,
            preserve_mtime: false,
            report_dir: None,
        }
    }
}

impl SyncDefaults {
    pub fn load(config_file: &Path) -> Self {
        load_section(config_file, "sync").unwrap_or_default()
    }
}

/// 应用配置目录（`~/.config/collsync` 等）
pub fn app_config_dir() -> PathBuf {
    crate::dirs::config_dir()
        .map(|p| p.join("collsync"))
        .unwrap_or_else(|| PathBuf::from(".collsync"))
}

/// 配置文件路径：显式指定的优先，否则使用应用配置目录
pub fn resolve_config_file(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| app_config_dir().join(CONFIG_FILE_NAME))
}

/// 读取存储配置，`store` 段必须存在
pub fn load_store_config(config_file: &Path) -> anyhow::Result<StoreConfig> {
    let content = fs::read_to_string(config_file)
        .map_err(|e| anyhow::anyhow!("无法读取配置文件 {:?}: {}", config_file, e))?;
    let config: serde_json::Value = serde_json::from_str(&content)?;
    let store = config
        .get("store")
        .ok_or_else(|| anyhow::anyhow!("配置文件 {:?} 缺少 store 段", config_file))?;
    Ok(serde_json::from_value(store.clone())?)
}

/// 读取配置文件中的某一段，文件或段不存在时返回 None
///
/// 文件或段格式错误时同样返回 None，但会记录警告。
pub fn load_section<T: DeserializeOwned>(config_file: &Path, key: &str) -> Option<T> {
    let content = fs::read_to_string(config_file).ok()?;
    let config: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("配置文件格式错误，使用默认值: {:?} - {}", config_file, e);
            return None;
        }
    };
    let section = config.get(key)?;
    match serde_json::from_value(section.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("配置段 {} 无效，使用默认值: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreType;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[test]
    fn test_load_sections() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &file,
            r#"{
                "store": { "type": "local", "path": "/srv/store" },
                "sync": { "verificationMethod": "checksum", "postCheck": true }
            }"#,
        )
        .unwrap();

        let store = load_store_config(&file).unwrap();
        assert_eq!(store.typ, StoreType::Local);
        assert_eq!(store.path.as_deref(), Some("/srv/store"));

        let sync = SyncDefaults::load(&file);
        assert_eq!(sync.verification_method, "checksum");
        assert!(sync.post_check);
        assert!(!sync.preserve_mtime);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_malformed_section_warns() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &file,
            r#"{ "sync": { "postCheck": "yes" }, "log": { "level": "debug" } }"#,
        )
        .unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let sync = tracing::subscriber::with_default(subscriber, || SyncDefaults::load(&file));

        assert!(!sync.post_check);
        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("配置段 sync 无效"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("absent.json");

        assert_eq!(SyncDefaults::load(&file).verification_method, "size");
        assert!(load_store_config(&file).is_err());
    }
}
