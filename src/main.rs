use clap::Parser;
use collsync_lib::commands::{self, Cli, Command};
use collsync_lib::config::resolve_config_file;
use collsync_lib::SyncError;
use collsync_lib::logging::{get_log_dir, LogConfig, SizeRotatingWriter};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// 初始化日志系统：文件日志 + 控制台（stderr）
fn init_logging(config_file: &Path) {
    let config = LogConfig::load(config_file);
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.tracing_level().into())
        .from_env_lossy()
        .add_directive("sqlx=warn".parse().unwrap())
        .add_directive("opendal=warn".parse().unwrap());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = if config.enabled {
        SizeRotatingWriter::new(&get_log_dir(), config.max_size_mb)
            .ok()
            .map(|writer| {
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false)
            })
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_file = resolve_config_file(cli.config.as_deref());
    init_logging(&config_file);

    let result = match &cli.command {
        Command::Sync(args) => commands::sync::run_sync(args, &config_file, false)
            .await
            .map(|report| report.failed.is_empty()),
        Command::Upload(args) => commands::sync::run_sync(args, &config_file, true)
            .await
            .map(|report| report.failed.is_empty()),
        Command::Check { collection } => {
            commands::check::check_connection(&config_file, collection.as_deref())
                .await
                .map(|result| {
                    println!("{}", result.message);
                    result.success
                })
        }
        Command::ClearMetadata { path } => commands::metadata::clear_metadata(&config_file, path)
            .await
            .map(|removed| {
                println!("已删除 {} 条元数据", removed);
                true
            }),
        Command::Summary { report } => commands::sync::print_summary(report).map(|_| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) if matches!(e.downcast_ref::<SyncError>(), Some(SyncError::Interrupted)) => {
            eprintln!("同步被中断，可用 --restart-from 继续");
            ExitCode::from(130)
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("错误: {:#}", e);
            ExitCode::from(2)
        }
    }
}
