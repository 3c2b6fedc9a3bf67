use crate::config::JobConfig;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// 下载单个远程文件，未指定输出文件时写到标准输出
pub async fn run(config: &JobConfig, identifier: &str, out: Option<&Path>) -> Result<()> {
    let reader = config.reader();
    let data = reader
        .get_blob_data_by_identifier(identifier)
        .await
        .with_context(|| format!("下载失败: {}", identifier))?;

    match out {
        Some(path) => {
            tokio::fs::write(path, &data)
                .await
                .with_context(|| format!("写入文件失败: {:?}", path))?;
            info!("已下载 {} ({} 字节) 到 {:?}", identifier, data.len(), path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
