//! 同步报告 - 既是审计日志，也是下次断点续传的输入

use crate::core::transfer::TransferResult;
use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// 一次同步的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub succeeded: Vec<String>,
    #[serde(default)]
    pub skipped: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
    #[serde(default)]
    pub cumulative_filesize_in_bytes: u64,
}

impl RunReport {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }

    /// 单个文件的部分报告
    pub fn from_outcome(file_id: impl Into<String>, result: &TransferResult) -> Self {
        let mut report = Self::default();
        let file_id = file_id.into();
        match result {
            TransferResult::Succeeded { bytes } => {
                report.succeeded.push(file_id);
                report.cumulative_filesize_in_bytes = *bytes;
            }
            TransferResult::Skipped => report.skipped.push(file_id),
            TransferResult::Failed => report.failed.push(file_id),
        }
        report
    }

    /// 合并另一份部分报告，保持各列表的先后顺序
    pub fn merge(mut self, other: RunReport) -> Self {
        self.succeeded.extend(other.succeeded);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
        self.cumulative_filesize_in_bytes += other.cumulative_filesize_in_bytes;
        self
    }

    pub fn total_files(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len()
    }

    /// 写入 JSON 文件
    pub fn persist(&self, path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SyncError::Report(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| SyncError::Report(e.to_string()))?;
        info!("同步报告已写入: {:?}", path);
        Ok(())
    }

    /// 读取 JSON 文件
    pub fn load(path: &Path) -> SyncResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Report(format!("{:?}: {}", path, e)))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// 人类可读的汇总
impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} 已同步到 {}", self.source, self.destination)?;
        writeln!(f, "跳过 {} 个文件（远程已是最新）", self.skipped.len())?;
        writeln!(f, "成功上传 {} 个文件", self.succeeded.len())?;
        writeln!(
            f,
            "成功上传的文件总大小: {} 字节",
            self.cumulative_filesize_in_bytes
        )?;
        write!(f, "失败 {} 个文件（上传失败或校验不一致）", self.failed.len())
    }
}

/// 自动生成的报告文件名，精确到秒
pub fn report_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("sync_log_{}.json", now.format("%Y%m%d%H%M%S"))
}

/// 报告文件路径
pub fn report_path(dir: &Path) -> PathBuf {
    dir.join(report_file_name(chrono::Local::now()))
}

/// 断点续传记录：上一次运行中已成功或已跳过的文件
#[derive(Debug, Clone, Default)]
pub struct RestartLedger {
    done: HashSet<String>,
}

impl RestartLedger {
    pub fn load(path: &Path) -> SyncResult<Self> {
        let report = RunReport::load(path)?;
        info!(
            "读取断点记录 {:?}: {} 成功, {} 跳过",
            path,
            report.succeeded.len(),
            report.skipped.len()
        );
        Ok(Self::from_report(&report))
    }

    pub fn from_report(report: &RunReport) -> Self {
        Self {
            done: report
                .succeeded
                .iter()
                .chain(report.skipped.iter())
                .cloned()
                .collect(),
        }
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.done.contains(file_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_merge_accumulates() {
        let report = RunReport::new("/src", "/dest")
            .merge(RunReport::from_outcome("a", &TransferResult::Succeeded { bytes: 10 }))
            .merge(RunReport::from_outcome("b", &TransferResult::Skipped))
            .merge(RunReport::from_outcome("c", &TransferResult::Failed))
            .merge(RunReport::from_outcome("d", &TransferResult::Succeeded { bytes: 20 }));

        assert_eq!(report.succeeded, vec!["a", "d"]);
        assert_eq!(report.skipped, vec!["b"]);
        assert_eq!(report.failed, vec!["c"]);
        assert_eq!(report.cumulative_filesize_in_bytes, 30);
        assert_eq!(report.total_files(), 4);
        assert_eq!(report.source, "/src");
    }

    #[test]
    fn test_persist_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/report.json");
        let report = RunReport::new("/src", "/dest")
            .merge(RunReport::from_outcome("a", &TransferResult::Succeeded { bytes: 3 }));

        report.persist(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["source"], "/src");
        assert_eq!(value["destination"], "/dest");
        assert_eq!(value["succeeded"][0], "a");
        assert_eq!(value["cumulative_filesize_in_bytes"], 3);
        assert!(value["failed"].as_array().unwrap().is_empty());

        assert_eq!(RunReport::load(&path).unwrap(), report);
    }

    #[test]
    fn test_ledger_uses_succeeded_and_skipped() {
        let mut report = RunReport::new("/src", "/dest");
        report.succeeded = vec!["a".into(), "b".into()];
        report.skipped = vec!["c".into(), "a".into()];
        report.failed = vec!["d".into()];

        let ledger = RestartLedger::from_report(&report);

        assert!(ledger.contains("a"));
        assert!(ledger.contains("b"));
        assert!(ledger.contains("c"));
        assert!(!ledger.contains("d"));
    }

    #[test]
    fn test_report_file_name() {
        let now = chrono::Local.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(report_file_name(now), "sync_log_20240305070809.json");
    }

    #[test]
    fn test_summary_text() {
        let report = RunReport::new("/src", "/dest")
            .merge(RunReport::from_outcome("a", &TransferResult::Succeeded { bytes: 30 }));
        let text = report.to_string();
        assert!(text.contains("/src 已同步到 /dest"));
        assert!(text.contains("成功上传 1 个文件"));
        assert!(text.contains("30 字节"));
    }
}
