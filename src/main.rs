use clap::{Args, Parser, Subcommand};
use ftpsync::commands::{self, apply::SourceKind};
use ftpsync::logging::{LogConfig, SizeRotatingWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "ftpsync", version, about = "FTP/SFTP 文件同步")]
struct Cli {
    /// 任务配置文件（JSON）
    #[arg(short, long, global = true, default_value = "ftpsync.json", env = "FTPSYNC_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 扫描远程目录并输出数据行
    Scan,
    /// 把变更集应用到远程目录
    Apply(ApplyArgs),
    /// 下载单个远程文件
    Fetch {
        identifier: String,
        /// 输出文件，默认写到标准输出
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// 测试连接
    Test,
}

#[derive(Args)]
struct ApplyArgs {
    /// 变更集文件（JSON）
    #[arg(long)]
    changes: PathBuf,
    /// 源文件所在的本地目录
    #[arg(long, conflicts_with = "source_config", required_unless_present = "source_config")]
    source_dir: Option<PathBuf>,
    /// 源数据集的任务配置
    #[arg(long)]
    source_config: Option<PathBuf>,
}

/// 初始化日志系统
fn init_logging(config: &LogConfig) {
    if !config.enabled {
        // 日志已禁用，只初始化一个空的 subscriber
        let _ = tracing::subscriber::set_global_default(tracing_subscriber::registry());
        return;
    }

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(config.tracing_level().into());
    match SizeRotatingWriter::new(&config.log_dir(), config.max_size_mb) {
        Ok(file_writer) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false);

            // 控制台只输出到标准错误，标准输出留给数据
            let console_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false);

            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(console_layer);
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        Err(e) => {
            // 文件日志创建失败，回退到控制台
            let console_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false);
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer);
            let _ = tracing::subscriber::set_global_default(subscriber);
            tracing::warn!("无法创建日志文件: {}", e);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = commands::load_job(&cli.config)?;
    init_logging(&config.log);

    match cli.command {
        Command::Scan => commands::scan::run(&config).await?,
        Command::Apply(args) => {
            let source = match (&args.source_dir, &args.source_config) {
                (Some(dir), _) => SourceKind::Directory(dir),
                (None, Some(job)) => SourceKind::Job(job),
                (None, None) => anyhow::bail!("需要 --source-dir 或 --source-config"),
            };
            commands::apply::run(&config, &args.changes, source).await?
        }
        Command::Fetch { identifier, out } => {
            commands::fetch::run(&config, &identifier, out.as_deref()).await?
        }
        Command::Test => {
            let result = commands::test::test_connection(&config).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(result.success);
        }
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("错误: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
