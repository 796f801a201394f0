use crate::core::checksum::{local_digest, normalize_remote_digest};
use crate::error::{StoreError, SyncError};
use crate::store::{CollectionStore, Lookup};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// 校验方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    /// 只比较大小（默认）
    #[default]
    Size,
    /// 大小相同时再比较 SHA-256
    Checksum,
}

impl FromStr for VerificationMethod {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "size" => Ok(VerificationMethod::Size),
            "checksum" => Ok(VerificationMethod::Checksum),
            other => Err(SyncError::Config(format!(
                "不支持的校验方式: {} (可选 size / checksum)",
                other
            ))),
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationMethod::Size => write!(f, "size"),
            VerificationMethod::Checksum => write!(f, "checksum"),
        }
    }
}

/// 校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// 远程内容与本地一致
    InSync,
    /// 远程内容不同或无法确认
    OutOfSync,
    /// 远程对象不存在
    RemoteAbsent,
}

impl VerificationOutcome {
    pub fn needs_transfer(self) -> bool {
        !matches!(self, VerificationOutcome::InSync)
    }
}

/// 文件比较器
///
/// 远程不存在、被锁定或查询出错都不会向上传播，只会得到需要上传的结果。
#[derive(Debug, Clone, Copy, Default)]
pub struct FileComparator {
    method: VerificationMethod,
}

impl FileComparator {
    pub fn new(method: VerificationMethod) -> Self {
        Self { method }
    }

    /// 比较本地文件和远程数据对象
    pub async fn verify(
        &self,
        store: &dyn CollectionStore,
        local_path: &Path,
        remote_path: &str,
    ) -> VerificationOutcome {
        match self.method {
            VerificationMethod::Size => compare_size(store, local_path, remote_path).await,
            VerificationMethod::Checksum => {
                compare_checksum(store, local_path, remote_path).await
            }
        }
    }
}

/// 比较大小
pub async fn compare_size(
    store: &dyn CollectionStore,
    local_path: &Path,
    remote_path: &str,
) -> VerificationOutcome {
    let remote_size = match store.data_object_size(remote_path).await {
        Lookup::Found(size) => size,
        Lookup::NotFound => return VerificationOutcome::RemoteAbsent,
        Lookup::Error(e) => {
            warn!("查询远程大小失败，按需要上传处理: {} - {}", remote_path, e);
            return VerificationOutcome::OutOfSync;
        }
    };

    let local_size = match tokio::fs::metadata(local_path).await {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!("读取本地文件信息失败: {:?} - {}", local_path, e);
            return VerificationOutcome::OutOfSync;
        }
    };

    if local_size == remote_size {
        VerificationOutcome::InSync
    } else {
        debug!(
            "文件大小不同: {} (local={}, remote={})",
            remote_path, local_size, remote_size
        );
        VerificationOutcome::OutOfSync
    }
}

/// 比较校验和，大小不同时直接返回，不计算哈希
pub async fn compare_checksum(
    store: &dyn CollectionStore,
    local_path: &Path,
    remote_path: &str,
) -> VerificationOutcome {
    match compare_size(store, local_path, remote_path).await {
        VerificationOutcome::InSync => {}
        other => return other,
    }

    let remote_raw = match store.data_object_checksum(remote_path).await {
        Lookup::Found(raw) => raw,
        Lookup::NotFound => return VerificationOutcome::RemoteAbsent,
        Lookup::Error(StoreError::Locked(reason)) => {
            debug!("远程对象被锁定，重新上传: {} - {}", remote_path, reason);
            return VerificationOutcome::OutOfSync;
        }
        Lookup::Error(e) => {
            warn!("获取远程校验和失败: {} - {}", remote_path, e);
            return VerificationOutcome::OutOfSync;
        }
    };

    let Some(remote_digest) = normalize_remote_digest(remote_raw.as_deref()) else {
        debug!("远程校验和无法比较: {} ({:?})", remote_path, remote_raw);
        return VerificationOutcome::OutOfSync;
    };

    let local = match local_digest(local_path).await {
        Ok(d) => d,
        Err(e) => {
            warn!("计算本地校验和失败: {:?} - {}", local_path, e);
            return VerificationOutcome::OutOfSync;
        }
    };

    if local == remote_digest {
        VerificationOutcome::InSync
    } else {
        debug!(
            "校验和不同: {} (local={}, remote={})",
            remote_path, local, remote_digest
        );
        VerificationOutcome::OutOfSync
    }
}
