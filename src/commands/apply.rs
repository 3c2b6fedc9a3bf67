use crate::config::JobConfig;
use crate::core::source::{BlobSource, DirectorySource};
use crate::core::status::SyncStatus;
use crate::core::writer::BatchReport;
use crate::model::ChangeSet;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// 源数据来自本地目录或另一个远程任务
pub enum SourceKind<'a> {
    Directory(&'a Path),
    Job(&'a Path),
}

/// 进度输出到标准错误，Ctrl-C 设置取消标志
pub struct ConsoleStatus {
    cancel_flag: Arc<AtomicBool>,
}

impl ConsoleStatus {
    pub fn new(cancel_flag: Arc<AtomicBool>) -> Self {
        Self { cancel_flag }
    }
}

impl SyncStatus for ConsoleStatus {
    fn log_message(&self, message: &str) {
        eprintln!("错误: {}", message);
    }

    fn progress(&self, total: usize, current: usize) {
        eprintln!("[{}/{}]", current, total);
    }

    fn continue_processing(&self) -> bool {
        !self.cancel_flag.load(Ordering::SeqCst)
    }
}

pub fn load_changes(path: &Path) -> Result<ChangeSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("读取变更文件失败: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("解析变更文件失败: {:?}", path))
}

/// 把变更集应用到配置的目标
pub async fn run(config: &JobConfig, changes_path: &Path, source: SourceKind<'_>) -> Result<()> {
    let mut changes = load_changes(changes_path)?;

    let source: Box<dyn BlobSource> = match source {
        SourceKind::Directory(dir) => Box::new(DirectorySource::new(dir, config.max_blob_size())),
        SourceKind::Job(path) => Box::new(super::load_job(path)?.reader()),
    };

    let cancel_flag = Arc::new(AtomicBool::new(false));
    let flag = cancel_flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，当前项完成后停止");
            flag.store(true, Ordering::SeqCst);
        }
    });
    let status = ConsoleStatus::new(cancel_flag);

    let writer = config.reader().writer(config.policy());
    let report = writer
        .execute(&mut changes, source.as_ref(), &status)
        .await
        .context("同步失败")?;

    print_report(&report)?;
    if report.cancelled {
        info!("同步已取消，{} 项未处理", changes.pending());
    }
    Ok(())
}

fn print_report(report: &BatchReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_changes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("changes.json");
        std::fs::write(
            &file,
            r#"{
                "added": [{ "sourceIdentifier": "in/a.csv", "fullFileName": "a.csv" }],
                "deleted": [{ "targetIdentifier": "/out/old.csv" }]
            }"#,
        )
        .unwrap();

        let changes = load_changes(&file).unwrap();
        assert_eq!(changes.added.len(), 1);
        assert!(changes.updated.is_empty());
        assert_eq!(changes.deleted.len(), 1);
        assert_eq!(changes.pending(), 2);
    }

    #[test]
    fn test_console_status_cancel() {
        let flag = Arc::new(AtomicBool::new(false));
        let status = ConsoleStatus::new(flag.clone());
        assert!(status.continue_processing());
        flag.store(true, Ordering::SeqCst);
        assert!(!status.continue_processing());
    }
}
