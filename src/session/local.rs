use super::{PutOptions, TransferResult, TransferSession};
use crate::core::path;
use crate::error::{Result, SyncError};
use crate::model::RemoteFileRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 本地目录充当服务器，远程绝对路径解析到该目录下
pub struct LocalSession {
    base_path: PathBuf,
    name: String,
}

impl LocalSession {
    pub fn open(path: &str) -> Result<Self> {
        let base_path = PathBuf::from(path);
        if !base_path.is_dir() {
            return Err(SyncError::connection(
                format!("local:{}", path),
                "目录不存在",
            ));
        }
        let name = format!("local:{}", path);
        Ok(Self { base_path, name })
    }

    /// 映射到基目录下的本地路径，含 `.`/`..` 段的路径会越出基目录，直接拒绝
    fn resolve_path(&self, path: &str) -> Result<PathBuf> {
        let segments = path::checked_segments(path)
            .ok_or_else(|| SyncError::remote(path, "路径包含 . 或 .. 段"))?;
        Ok(segments
            .iter()
            .fold(self.base_path.clone(), |acc, s| acc.join(s)))
    }

    fn modified_utc(metadata: &std::fs::Metadata) -> DateTime<Utc> {
        metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_default()
    }
}

#[async_trait]
impl TransferSession for LocalSession {
    async fn list_directory(&self, path: &str) -> Result<Option<Vec<RemoteFileRecord>>> {
        let dir = self.resolve_path(path)?;
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| SyncError::remote(path, e))?;

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SyncError::remote(path, e))?
        {
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| SyncError::remote(path, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let full_path = path::combine(path, &name);
            let modified = Self::modified_utc(&metadata);

            records.push(if metadata.is_dir() {
                RemoteFileRecord::directory(full_path, modified)
            } else {
                RemoteFileRecord::file(full_path, modified, metadata.len())
            });
        }

        Ok(Some(records))
    }

    async fn get_file(&self, remote_path: &str, local_path: &Path) -> Result<TransferResult> {
        let source = self.resolve_path(remote_path)?;
        if !source.is_file() {
            return Ok(TransferResult::failed(format!("文件不存在: {}", remote_path)));
        }
        fs::copy(&source, local_path).await?;
        Ok(TransferResult::success())
    }

    async fn put_file(
        &self,
        local_path: &Path,
        remote_path: &str,
        options: PutOptions,
    ) -> Result<TransferResult> {
        let target = self.resolve_path(remote_path)?;

        if !options.overwrite && target.exists() {
            return Ok(TransferResult::failed(format!("文件已存在: {}", remote_path)));
        }
        match target.parent() {
            Some(parent) if parent.is_dir() => {}
            _ => {
                return Ok(TransferResult::failed(format!(
                    "远程目录不存在: {}",
                    path::parent_dir(remote_path)
                )))
            }
        }

        if let Err(e) = fs::copy(local_path, &target).await {
            return Ok(TransferResult::failed(e.to_string()));
        }

        if options.preserve_timestamp {
            let metadata = fs::metadata(local_path).await?;
            let mtime = FileTime::from_last_modification_time(&metadata);
            filetime::set_file_mtime(&target, mtime)?;
        }

        Ok(TransferResult::success())
    }

    async fn remove_file(&self, remote_path: &str) -> Result<()> {
        fs::remove_file(self.resolve_path(remote_path)?)
            .await
            .map_err(|e| SyncError::remote(remote_path, e))
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        fs::try_exists(self.resolve_path(path)?)
            .await
            .map_err(|e| SyncError::remote(path, e))
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        fs::create_dir(self.resolve_path(path)?)
            .await
            .map_err(|e| SyncError::remote(path, e))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
