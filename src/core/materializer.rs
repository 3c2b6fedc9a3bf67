//! 远程目录按需创建

use crate::core::path;
use crate::error::Result;
use crate::session::TransferSession;
use std::collections::HashSet;
use tracing::debug;

/// 确保目标目录及其所有祖先存在，只创建缺失的部分
///
/// 已确认存在的路径会在同一批次内记住，重复写入同一目录时不再访问服务器。
#[derive(Debug, Default)]
pub struct DirectoryMaterializer {
    known: HashSet<String>,
}

impl DirectoryMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回本次创建的目录数
    pub async fn ensure(&mut self, session: &dyn TransferSession, dir: &str) -> Result<usize> {
        let web_dir = path::ensure_web_path(dir);
        let segments = path::segments(&web_dir);
        if segments.is_empty() {
            return Ok(0);
        }

        let depth = segments.len();
        let target = path::prefix_path(&segments, depth);
        if self.known.contains(&target) {
            return Ok(0);
        }
        if session.file_exists(&target).await? {
            self.remember(&segments, depth);
            return Ok(0);
        }

        // 从最深的祖先往上找第一个已存在的前缀
        let mut existing = 0;
        for level in (1..depth).rev() {
            let prefix = path::prefix_path(&segments, level);
            if self.known.contains(&prefix) || session.file_exists(&prefix).await? {
                existing = level;
                break;
            }
        }
        self.remember(&segments, existing);

        // 自上而下创建，每次创建时父目录都已存在；任何一级失败立即返回
        let mut created = 0;
        for level in existing + 1..=depth {
            let prefix = path::prefix_path(&segments, level);
            debug!("创建远程目录: {}", prefix);
            session.create_directory(&prefix).await?;
            self.known.insert(prefix);
            created += 1;
        }

        Ok(created)
    }

    fn remember(&mut self, segments: &[&str], depth: usize) {
        for level in 1..=depth {
            self.known.insert(path::prefix_path(segments, level));
        }
    }
}
