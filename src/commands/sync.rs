use super::SyncArgs;
use crate::config::{load_store_config, SyncDefaults};
use crate::core::report::report_path;
use crate::core::{RunReport, SyncEngine, SyncOptions, VerificationMethod};
use crate::error::SyncError;
use crate::Session;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 合并命令行参数和配置文件默认值
pub fn build_options(
    args: &SyncArgs,
    defaults: &SyncDefaults,
    force: bool,
) -> anyhow::Result<SyncOptions> {
    let method: VerificationMethod = args
        .verification
        .as_deref()
        .unwrap_or(defaults.verification_method.as_str())
        .parse()?;

    Ok(SyncOptions {
        verification_method: method,
        post_check: args.post_check || defaults.post_check,
        restart_from: args.restart_from.clone(),
        preserve_mtime: args.preserve_mtime || defaults.preserve_mtime,
        force,
    })
}

/// 报告路径：命令行指定的优先，否则在报告目录下自动生成
pub fn resolve_report_path(args: &SyncArgs, defaults: &SyncDefaults) -> PathBuf {
    args.report.clone().unwrap_or_else(|| {
        let dir = defaults
            .report_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        report_path(&dir)
    })
}

/// 执行同步（`force` 为真时即上传模式）并打印汇总，Ctrl-C 时保存报告后退出
pub async fn run_sync(
    args: &SyncArgs,
    config_file: &Path,
    force: bool,
) -> anyhow::Result<RunReport> {
    run_sync_until(args, config_file, force, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("无法监听中断信号: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// 同 `run_sync`，`interrupt` 完成时中止同步
///
/// 中止时丢弃引擎的 future，报告由引擎内部的 guard 写入。
pub async fn run_sync_until(
    args: &SyncArgs,
    config_file: &Path,
    force: bool,
    interrupt: impl Future<Output = ()>,
) -> anyhow::Result<RunReport> {
    let defaults = SyncDefaults::load(config_file);
    let options = build_options(args, &defaults, force)?;
    let report_file = resolve_report_path(args, &defaults);
    let store_config = load_store_config(config_file)?;

    let session = Session::open(&store_config).await?;
    let engine = SyncEngine::new(session.store(), options);
    let result = tokio::select! {
        result = engine.run(&args.source, &args.destination, &report_file) => result,
        _ = interrupt => {
            warn!("收到中断信号，报告已保存: {:?}", report_file);
            Err(SyncError::Interrupted)
        }
    };
    session.close().await;

    let report = result?;
    info!("报告文件: {:?}", report_file);
    println!("{}", report);
    println!("详细信息见报告文件: {}", report_file.display());
    Ok(report)
}

/// 打印已保存报告的汇总
pub fn print_summary(report_file: &Path) -> anyhow::Result<RunReport> {
    let report = RunReport::load(report_file)?;
    println!("{}", report);
    Ok(report)
}
