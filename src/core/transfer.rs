//! 单文件传输

use crate::core::comparator::{compare_checksum, VerificationOutcome};
use crate::store::CollectionStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// 单个文件的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferResult {
    /// 上传成功，记录远程大小
    Succeeded { bytes: u64 },
    /// 远程已是最新
    Skipped,
    Failed,
}

impl std::fmt::Display for TransferResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferResult::Succeeded { .. } => write!(f, "succeeded"),
            TransferResult::Skipped => write!(f, "skipped"),
            TransferResult::Failed => write!(f, "failed"),
        }
    }
}

/// 传输执行器
pub struct TransferExecutor<'a> {
    store: &'a dyn CollectionStore,
}

impl<'a> TransferExecutor<'a> {
    pub fn new(store: &'a dyn CollectionStore) -> Self {
        Self { store }
    }

    /// 上传文件，任何错误都只返回 false
    ///
    /// `post_check` 为真时上传后再比较一次校验和，不一致按失败处理。
    pub async fn upload(&self, local_path: &Path, remote_path: &str, post_check: bool) -> bool {
        info!("上传: {:?} -> {}", local_path, remote_path);

        if let Err(e) = self.store.put(local_path, remote_path).await {
            warn!("上传失败: {:?} - {}", local_path, e);
            return false;
        }

        if !post_check {
            return true;
        }

        debug!("上传后校验: {}", remote_path);
        match compare_checksum(self.store, local_path, remote_path).await {
            VerificationOutcome::InSync => true,
            outcome => {
                warn!("上传后校验不一致: {} ({:?})", remote_path, outcome);
                false
            }
        }
    }
}
