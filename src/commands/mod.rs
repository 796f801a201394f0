pub mod check;
pub mod metadata;
pub mod sync;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// 命令行入口
#[derive(Parser, Debug)]
#[command(name = "collsync")]
#[command(about = "Synchronize a local directory into a collection store")]
pub struct Cli {
    /// 配置文件路径（包含 store / sync / log 段）
    #[arg(long, global = true, env = "COLLSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 同步目录：已是最新的文件跳过
    Sync(SyncArgs),
    /// 上传目录：不做校验，全部上传
    Upload(SyncArgs),
    /// 测试能否连接存储
    Check {
        /// 要检查的集合，缺省为根集合
        collection: Option<String>,
    },
    /// 删除对象或集合（含子孙）上的全部元数据
    ClearMetadata {
        path: String,
    },
    /// 重新打印某次同步报告的汇总
    Summary {
        report: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// 本地目录
    pub source: PathBuf,

    /// 远程目标集合
    pub destination: String,

    /// 校验方式 (size/checksum)
    #[arg(long = "verification")]
    pub verification: Option<String>,

    /// 上传后比较校验和
    #[arg(long)]
    pub post_check: bool,

    /// 附加原始修改时间
    #[arg(long)]
    pub preserve_mtime: bool,

    /// 从上一次的同步报告继续
    #[arg(long = "restart-from")]
    pub restart_from: Option<PathBuf>,

    /// 报告文件路径，缺省自动生成
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync_args() {
        let cli = Cli::try_parse_from([
            "collsync",
            "sync",
            "--verification",
            "checksum",
            "--post-check",
            "--restart-from",
            "sync_log_20240101000000.json",
            "/data/root",
            "/zone/home/dest",
        ])
        .unwrap();

        match cli.command {
            Command::Sync(args) => {
                assert_eq!(args.source, PathBuf::from("/data/root"));
                assert_eq!(args.destination, "/zone/home/dest");
                assert_eq!(args.verification.as_deref(), Some("checksum"));
                assert!(args.post_check);
                assert!(!args.preserve_mtime);
                assert!(args.restart_from.is_some());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
