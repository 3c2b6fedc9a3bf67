//! 同步时读取源文件内容

use crate::core::path;
use crate::error::{Result, SyncError};
use crate::model::ChangeItem;
use async_trait::async_trait;
use std::path::PathBuf;

/// 源数据集：按变更项的 source identifier 读取文件内容
#[async_trait]
pub trait BlobSource: Send + Sync {
    async fn get_blob_data(&self, item: &ChangeItem) -> Result<Vec<u8>>;
}

/// 以本地目录作为源数据集，identifier 为目录内的相对或绝对 web 路径
pub struct DirectorySource {
    base_path: PathBuf,
    max_size: u64,
}

impl DirectorySource {
    pub fn new(base_path: impl Into<PathBuf>, max_size: u64) -> Self {
        Self {
            base_path: base_path.into(),
            max_size,
        }
    }

    fn resolve(&self, identifier: &str) -> Result<PathBuf> {
        let segments = path::checked_segments(identifier).ok_or_else(|| {
            SyncError::InvalidItem(format!("source identifier 越出源目录: {}", identifier))
        })?;
        Ok(segments
            .iter()
            .fold(self.base_path.clone(), |acc, s| acc.join(s)))
    }
}

#[async_trait]
impl BlobSource for DirectorySource {
    async fn get_blob_data(&self, item: &ChangeItem) -> Result<Vec<u8>> {
        let identifier = item
            .source_identifier
            .as_deref()
            .ok_or_else(|| SyncError::InvalidItem("缺少 source identifier".to_string()))?;

        let file = self.resolve(identifier)?;
        let size = tokio::fs::metadata(&file).await?.len();
        if size > self.max_size {
            return Err(SyncError::Oversize {
                path: identifier.to_string(),
                size,
                limit: self.max_size,
            });
        }
        Ok(tokio::fs::read(&file).await?)
    }
}
