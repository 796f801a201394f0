use crate::error::{SyncError, SyncResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// 扫描时的文件快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// 本地完整路径
    pub path: PathBuf,
    /// 相对同步根目录的路径（`/` 分隔，根目录为空串）
    pub relative: String,
    pub size: u64,
    pub is_dir: bool,
}

impl FileEntry {
    /// 作为报告中的文件标识
    pub fn id(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// 一次完整扫描的结果，顺序为深度优先遍历顺序
#[derive(Debug, Clone)]
pub struct TreeListing {
    /// 包含根目录本身
    pub directories: Vec<FileEntry>,
    pub files: Vec<FileEntry>,
}

/// 本地目录扫描器
pub struct FileScanner {
    root: PathBuf,
}

impl FileScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 递归列出全部目录和文件
    ///
    /// 同一目录下按文件名排序，保证多次运行顺序一致。符号链接不跟随。
    pub fn scan(&self) -> SyncResult<TreeListing> {
        if !self.root.is_dir() {
            return Err(SyncError::Scan(format!("{:?} 不是目录", self.root)));
        }

        info!("开始扫描: {:?}", self.root);

        let mut directories = Vec::new();
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| SyncError::Scan(e.to_string()))?;
            let file_type = entry.file_type();

            if !file_type.is_dir() && !file_type.is_file() {
                debug!("跳过非普通文件: {:?}", entry.path());
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| SyncError::Scan(format!("{:?}: {}", entry.path(), e)))?;
            let relative = relative_path(&self.root, entry.path());

            let file_entry = FileEntry {
                path: entry.path().to_path_buf(),
                relative,
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                is_dir: metadata.is_dir(),
            };

            if file_entry.is_dir {
                directories.push(file_entry);
            } else {
                files.push(file_entry);
            }
        }

        info!(
            "扫描完成: {} 个文件, {} 个目录",
            files.len(),
            directories.len()
        );

        Ok(TreeListing {
            directories,
            files,
        })
    }
}

/// 相对路径，统一使用 `/`
fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

/// 计算远程路径：`<destination>/<根目录名>/<相对路径>`
///
/// 同一组 (源, 目标) 对同一个本地路径总是得到同一个远程路径。
pub fn remote_target(root: &Path, destination: &str, relative: &str) -> String {
    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = format!("{}/{}", destination.trim_end_matches('/'), root_name);

    if relative.is_empty() {
        base
    } else {
        format!("{}/{}", base, relative)
    }
}

/// 集合创建顺序：先按深度，再按字典序，父集合总在子集合之前
pub fn collection_order(mut collections: Vec<String>) -> Vec<String> {
    collections.sort_by(|a, b| {
        let depth_a = a.matches('/').count();
        let depth_b = b.matches('/').count();
        depth_a.cmp(&depth_b).then_with(|| a.cmp(b))
    });
    collections.dedup();
    collections
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_lists_depth_first() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir_all(root.join("sub/deeper")).unwrap();
        std::fs::write(root.join("a.txt"), b"0123456789").unwrap();
        std::fs::write(root.join("sub/b.txt"), b"x").unwrap();
        std::fs::write(root.join("sub/deeper/c.txt"), b"").unwrap();
        std::fs::write(root.join("z.txt"), b"zz").unwrap();

        let listing = FileScanner::new(&root).scan().unwrap();

        let files: Vec<_> = listing.files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(files, vec!["a.txt", "sub/b.txt", "sub/deeper/c.txt", "z.txt"]);

        let dirs: Vec<_> = listing.directories.iter().map(|d| d.relative.as_str()).collect();
        assert_eq!(dirs, vec!["", "sub", "sub/deeper"]);
        assert_eq!(listing.files[0].size, 10);
    }

    #[test]
    fn test_scan_rejects_missing_root() {
        let dir = TempDir::new().unwrap();
        let result = FileScanner::new(dir.path().join("missing")).scan();
        assert!(matches!(result, Err(SyncError::Scan(_))));
    }

    #[test]
    fn test_remote_target() {
        let root = Path::new("/data/root");
        assert_eq!(remote_target(root, "/zone/dest/", ""), "/zone/dest/root");
        assert_eq!(
            remote_target(root, "/zone/dest", "sub/b.txt"),
            "/zone/dest/root/sub/b.txt"
        );
    }

    #[test]
    fn test_collection_order_parents_first() {
        let ordered = collection_order(vec![
            "/d/root/b/x".to_string(),
            "/d/root/b".to_string(),
            "/d/root".to_string(),
            "/d/root/a".to_string(),
        ]);
        assert_eq!(
            ordered,
            vec!["/d/root", "/d/root/a", "/d/root/b", "/d/root/b/x"]
        );
    }
}
