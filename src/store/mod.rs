#![allow(non_snake_case)]

pub mod catalog;
pub mod opendal_store;

use crate::error::StoreError;
use async_trait::async_trait;
use opendal::{layers::TimeoutLayer, Operator};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub use catalog::AvuCatalog;
pub use opendal_store::OpendalStore;

// ============ 公共常量 ============

/// 非 IO 操作超时（秒）- stat, create_dir 等
pub const OP_TIMEOUT_SECS: u64 = 60;
/// IO 操作超时（秒）- read, write 等
pub const IO_TIMEOUT_SECS: u64 = 300;

/// 查询结果：找到 / 不存在 / 出错
///
/// "不存在" 是正常分支，不是错误。
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Error(StoreError),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            _ => None,
        }
    }
}

/// 属性-值-单位 元数据三元组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avu {
    pub attribute: String,
    pub value: String,
    #[serde(default)]
    pub unit: String,
}

impl Avu {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
            unit: String::new(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }
}

/// 集合存储抽象接口
///
/// 集合类似目录，数据对象类似文件。路径均为以 `/` 分隔的绝对路径。
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// 查询集合是否存在
    async fn get_collection(&self, path: &str) -> Lookup<()>;

    /// 创建集合，父集合必须已存在
    async fn create_collection(&self, path: &str) -> Result<(), StoreError>;

    /// 查询数据对象大小
    async fn data_object_size(&self, path: &str) -> Lookup<u64>;

    /// 查询数据对象的原生校验和（例如 `sha2:<base64>`），可能没有记录
    async fn data_object_checksum(&self, path: &str) -> Lookup<Option<String>>;

    /// 上传本地文件到数据对象
    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<(), StoreError>;

    /// 原子地附加一组元数据，全部成功或全部失败
    async fn attach_metadata(&self, path: &str, avus: &[Avu]) -> Result<(), StoreError>;

    /// 删除对象或集合（含子孙）上的全部元数据，返回删除条数
    async fn remove_metadata(&self, path: &str) -> Result<u64, StoreError>;

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}

/// 存储类型
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    Local,
    S3,
    WebDav,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(rename = "type")]
    pub typ: StoreType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessKey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secretKey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// 元数据目录数据库路径，缺省为数据目录下的 catalog.db
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
}

impl StoreConfig {
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            typ: StoreType::Local,
            path: Some(path.into()),
            bucket: None,
            region: None,
            accessKey: None,
            secretKey: None,
            endpoint: None,
            username: None,
            password: None,
            root: None,
            catalog: None,
        }
    }
}

/// 根据配置构建 opendal Operator，返回 (operator, 存储名称)
pub fn build_operator(config: &StoreConfig) -> anyhow::Result<(Operator, String)> {
    match config.typ {
        StoreType::Local => {
            use opendal::services::Fs;

            let path = config
                .path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Local store requires path"))?;
            std::fs::create_dir_all(path)?;
            tracing::info!("初始化本地存储: {}", path);

            let operator = Operator::new(Fs::default().root(path))?.finish();
            Ok((operator, format!("local:{}", path)))
        }
        StoreType::S3 => {
            use opendal::services::S3;

            let bucket = config
                .bucket
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("S3 store requires bucket"))?;
            let region = config
                .region
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("S3 store requires region"))?;
            let access_key = config
                .accessKey
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("S3 store requires accessKey"))?;
            let secret_key = config
                .secretKey
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("S3 store requires secretKey"))?;
            tracing::info!("初始化S3存储: bucket={}, region={}", bucket, region);

            let mut builder = S3::default()
                .bucket(bucket)
                .region(region)
                .access_key_id(access_key)
                .secret_access_key(secret_key);
            if let Some(ref ep) = config.endpoint {
                builder = builder.endpoint(ep);
            }
            if let Some(ref r) = config.root {
                builder = builder.root(r);
            }

            let operator = Operator::new(builder)?.layer(timeout_layer()).finish();
            Ok((operator, format!("s3://{}", bucket)))
        }
        StoreType::WebDav => {
            use opendal::services::Webdav;

            let endpoint = config
                .endpoint
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("WebDAV store requires endpoint"))?;
            let username = config
                .username
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("WebDAV store requires username"))?;
            let password = config
                .password
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("WebDAV store requires password"))?;
            tracing::info!("创建WebDAV存储: endpoint={}, root={:?}", endpoint, config.root);

            let mut builder = Webdav::default()
                .endpoint(endpoint)
                .username(username)
                .password(password);
            if let Some(ref r) = config.root {
                builder = builder.root(r);
            }

            let operator = Operator::new(builder)?.layer(timeout_layer()).finish();
            Ok((operator, format!("webdav://{}", endpoint.trim_end_matches('/'))))
        }
    }
}

fn timeout_layer() -> TimeoutLayer {
    TimeoutLayer::default()
        .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
        .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS))
}

/// 把远程绝对路径转换为 operator 的相对 key
pub(crate) fn object_key(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

/// 集合 key 以 `/` 结尾
pub(crate) fn collection_key(path: &str) -> String {
    let key = path.trim_matches('/');
    if key.is_empty() {
        "/".to_string()
    } else {
        format!("{}/", key)
    }
}

/// 父集合路径，根集合没有父集合
pub(crate) fn parent_collection(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    if idx == 0 {
        return None;
    }
    Some(&trimmed[..idx])
}
