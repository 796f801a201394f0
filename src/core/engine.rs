use crate::core::comparator::{FileComparator, VerificationMethod, VerificationOutcome};
use crate::core::metadata::MetadataPipeline;
use crate::core::report::{RestartLedger, RunReport};
use crate::core::scanner::{collection_order, remote_target, FileEntry, FileScanner};
use crate::core::transfer::{TransferExecutor, TransferResult};
use crate::error::{SyncError, SyncResult};
use crate::store::{CollectionStore, Lookup};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// 同步配置
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// 判断远程是否最新的方式
    pub verification_method: VerificationMethod,
    /// 上传后再比较一次校验和
    pub post_check: bool,
    /// 上一次运行的报告，其中成功和跳过的文件不再处理
    pub restart_from: Option<PathBuf>,
    /// 上传后附加原始修改时间
    pub preserve_mtime: bool,
    /// 不做校验，全部上传
    pub force: bool,
}

/// 同步引擎
///
/// 单线程顺序执行：先建立全部集合，再逐个处理文件。
pub struct SyncEngine<'a> {
    store: &'a dyn CollectionStore,
    options: SyncOptions,
    comparator: FileComparator,
    pipeline: MetadataPipeline,
}

impl<'a> SyncEngine<'a> {
    pub fn new(store: &'a dyn CollectionStore, options: SyncOptions) -> Self {
        Self {
            store,
            comparator: FileComparator::new(options.verification_method),
            pipeline: MetadataPipeline::from_options(options.preserve_mtime),
            options,
        }
    }

    /// 替换元数据提取流水线
    pub fn with_pipeline(mut self, pipeline: MetadataPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// 运行同步，无论成功与否都会把报告写入 `report_path`
    pub async fn run(
        &self,
        source: &Path,
        destination: &str,
        report_path: &Path,
    ) -> SyncResult<RunReport> {
        info!(
            "开始同步: {:?} -> {} ({}), 校验方式={}",
            source,
            destination,
            self.store.name(),
            self.options.verification_method
        );

        let initial = RunReport::new(source.to_string_lossy(), destination);
        let mut report = scopeguard::guard(initial, |report| {
            if let Err(e) = report.persist(report_path) {
                error!("写入同步报告失败: {}", e);
            }
        });

        let result = self.sync_into(&mut report, source, destination).await;
        let snapshot = (*report).clone();
        drop(report);

        match result {
            Ok(()) => {
                info!(
                    "同步完成: 成功 {}, 跳过 {}, 失败 {}, {} 字节",
                    snapshot.succeeded.len(),
                    snapshot.skipped.len(),
                    snapshot.failed.len(),
                    snapshot.cumulative_filesize_in_bytes
                );
                Ok(snapshot)
            }
            Err(e) => {
                error!("同步中止: {}", e);
                Err(e)
            }
        }
    }

    async fn sync_into(
        &self,
        report: &mut RunReport,
        source: &Path,
        destination: &str,
    ) -> SyncResult<()> {
        let root = std::fs::canonicalize(source)
            .map_err(|e| SyncError::Scan(format!("{:?}: {}", source, e)))?;
        report.source = root.to_string_lossy().into_owned();

        let listing = FileScanner::new(&root).scan()?;

        let collections = collection_order(
            listing
                .directories
                .iter()
                .map(|d| remote_target(&root, destination, &d.relative))
                .collect(),
        );

        let mut files = listing.files;
        if let Some(ledger_path) = &self.options.restart_from {
            let ledger = RestartLedger::load(ledger_path)?;
            let (done, remaining): (Vec<_>, Vec<_>) =
                files.into_iter().partition(|f| ledger.contains(&f.id()));
            report.skipped.extend(done.iter().map(FileEntry::id));
            info!(
                "断点续传: 排除 {} 个已处理文件, 剩余 {} 个",
                done.len(),
                remaining.len()
            );
            files = remaining;
        }

        for collection in &collections {
            self.ensure_collection(collection).await?;
        }

        for entry in &files {
            let remote = remote_target(&root, destination, &entry.relative);
            let result = self.sync_file(entry, &remote).await;
            debug!("{} -> {}", entry.relative, result);
            *report = std::mem::take(report).merge(RunReport::from_outcome(entry.id(), &result));
        }

        Ok(())
    }

    /// 集合已存在则保持不变，否则创建
    async fn ensure_collection(&self, collection: &str) -> SyncResult<()> {
        match self.store.get_collection(collection).await {
            Lookup::Found(()) => {
                debug!("集合已存在: {}", collection);
                Ok(())
            }
            Lookup::NotFound => {
                info!("创建集合: {}", collection);
                self.store
                    .create_collection(collection)
                    .await
                    .map_err(|source| SyncError::Structural {
                        collection: collection.to_string(),
                        source,
                    })
            }
            Lookup::Error(source) => Err(SyncError::Structural {
                collection: collection.to_string(),
                source,
            }),
        }
    }

    /// 处理单个文件，不会返回错误
    async fn sync_file(&self, entry: &FileEntry, remote: &str) -> TransferResult {
        let outcome = if self.options.force {
            VerificationOutcome::OutOfSync
        } else {
            self.comparator.verify(self.store, &entry.path, remote).await
        };

        if !outcome.needs_transfer() {
            debug!("{} 已是最新，跳过", remote);
            return TransferResult::Skipped;
        }

        let executor = TransferExecutor::new(self.store);
        if !executor
            .upload(&entry.path, remote, self.options.post_check)
            .await
        {
            return TransferResult::Failed;
        }

        let bytes = self
            .store
            .data_object_size(remote)
            .await
            .found()
            .unwrap_or(entry.size);

        if let Err(e) = self.pipeline.apply(self.store, &entry.path, remote).await {
            warn!("附加元数据失败: {} - {}", remote, e);
        }

        TransferResult::Succeeded { bytes }
    }
}
