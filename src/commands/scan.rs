use crate::config::JobConfig;
use crate::core::status::cancel_probe;
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// 扫描远程目录，按行输出 JSON
///
/// 中途取消时不输出任何行，以错误退出。
pub async fn run(config: &JobConfig) -> Result<()> {
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let flag = cancel_flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("收到中断信号，停止扫描");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let reader = config.reader().with_probe(cancel_probe(cancel_flag));
    let schema = crate::core::RemoteReader::default_schema();
    let table = reader.get_data_table(&schema).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for row in table.rows() {
        let line = serde_json::to_string(row).context("序列化数据行失败")?;
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
