//! 本地暂存文件
//!
//! 每次上传/下载使用一个唯一命名的临时文件，离开作用域时删除。

use crate::error::Result;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct StagingFile {
    path: PathBuf,
}

impl StagingFile {
    /// 只分配文件名，不创建文件（用作下载目标）
    pub fn reserve(dir: &Path) -> Self {
        let path = dir.join(format!("{}.tmp", uuid::Uuid::new_v4()));
        Self { path }
    }

    /// 创建暂存文件并写入内容
    pub async fn create(dir: &Path, data: &[u8]) -> Result<Self> {
        let staged = Self::reserve(dir);
        tokio::fs::write(&staged.path, data).await?;
        debug!("暂存 {} 字节到 {:?}", data.len(), staged.path);
        Ok(staged)
    }

    /// 设置本地修改时间，上传时据此保留时间戳
    pub fn set_modified(&self, modified: DateTime<Utc>) -> Result<()> {
        let mtime = FileTime::from_unix_time(modified.timestamp(), modified.timestamp_subsec_nanos());
        filetime::set_file_mtime(&self.path, mtime)?;
        Ok(())
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    pub async fn size(&self) -> Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("删除暂存文件失败 {:?}: {}", self.path, e),
        }
    }
}
