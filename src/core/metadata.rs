//! 元数据提取 - 上传成功后从本地文件提取 AVU 并一次性附加到远程对象

use crate::error::StoreError;
use crate::store::{Avu, CollectionStore};
use chrono::{DateTime, Local, SecondsFormat, Timelike};
use std::path::Path;
use tracing::{debug, warn};

/// 提取失败时写入的值
pub const UNKNOWN_VALUE: &str = "unknown";

/// 元数据提取器
///
/// 对任意合法路径都不能 panic；内部失败时返回 `UNKNOWN_VALUE` 或 `None`。
pub trait MetadataExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, path: &Path) -> Option<Avu>;
}

/// 原始修改时间
#[derive(Debug, Clone, Default)]
pub struct ModifyTimeExtractor;

impl ModifyTimeExtractor {
    pub const ATTRIBUTE: &'static str = "original_modify_time";

    fn modified(path: &Path) -> Option<String> {
        let modified = std::fs::metadata(path).ok()?.modified().ok()?;
        let local: DateTime<Local> = modified.into();
        let truncated = local.with_nanosecond(0)?;
        Some(truncated.to_rfc3339_opts(SecondsFormat::Secs, false))
    }
}

impl MetadataExtractor for ModifyTimeExtractor {
    fn name(&self) -> &str {
        Self::ATTRIBUTE
    }

    fn extract(&self, path: &Path) -> Option<Avu> {
        let value = Self::modified(path).unwrap_or_else(|| {
            warn!("无法读取修改时间: {:?}", path);
            UNKNOWN_VALUE.to_string()
        });
        Some(Avu::new(Self::ATTRIBUTE, value))
    }
}

/// 按顺序执行的提取器列表
#[derive(Default)]
pub struct MetadataPipeline {
    extractors: Vec<Box<dyn MetadataExtractor>>,
}

impl MetadataPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// 根据配置生成内置流水线
    pub fn from_options(preserve_mtime: bool) -> Self {
        let mut pipeline = Self::new();
        if preserve_mtime {
            pipeline = pipeline.with(ModifyTimeExtractor);
        }
        pipeline
    }

    pub fn with(mut self, extractor: impl MetadataExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// 运行全部提取器，收集非空结果
    pub fn collect(&self, path: &Path) -> Vec<Avu> {
        self.extractors
            .iter()
            .filter_map(|extractor| extractor.extract(path))
            .collect()
    }

    /// 提取并附加到远程对象，返回附加的条数
    pub async fn apply(
        &self,
        store: &dyn CollectionStore,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<usize, StoreError> {
        let avus = self.collect(local_path);
        if avus.is_empty() {
            return Ok(0);
        }

        store.attach_metadata(remote_path, &avus).await?;
        debug!("附加元数据 {} 条: {}", avus.len(), remote_path);
        Ok(avus.len())
    }
}
