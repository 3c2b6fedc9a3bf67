use crate::core::path;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// 远程列目录返回的一个条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileRecord {
    /// 服务器上的绝对路径
    pub full_remote_path: String,
    pub is_directory: bool,
    pub last_write_time_utc: DateTime<Utc>,
    /// 文件大小（目录为 0）
    pub length: u64,
}

impl RemoteFileRecord {
    pub fn file(full_remote_path: impl Into<String>, modified: DateTime<Utc>, length: u64) -> Self {
        Self {
            full_remote_path: full_remote_path.into(),
            is_directory: false,
            last_write_time_utc: modified,
            length,
        }
    }

    pub fn directory(full_remote_path: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            full_remote_path: full_remote_path.into(),
            is_directory: true,
            last_write_time_utc: modified,
            length: 0,
        }
    }

    /// 最后一段名称
    pub fn name(&self) -> &str {
        path::file_name(&self.full_remote_path)
    }

    /// `.` 或 `..` 伪条目
    pub fn is_pseudo_entry(&self) -> bool {
        matches!(self.name(), "." | "..")
    }
}

/// 扫描产生的一行，主键为远程完整路径
///
/// 相对路径和文件名总是从 `identifier` 推导，不单独保存。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRow {
    pub identifier: String,
    #[serde(skip)]
    root_path: Arc<str>,
    pub last_write_time_utc: DateTime<Utc>,
    pub length: u64,
}

impl NormalizedRow {
    pub fn new(record: &RemoteFileRecord, root_path: Arc<str>) -> Self {
        Self {
            identifier: record.full_remote_path.clone(),
            root_path,
            last_write_time_utc: record.last_write_time_utc,
            length: record.length,
        }
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// 去掉根路径后的完整相对路径（FullFileName）
    pub fn full_file_name(&self) -> String {
        path::strip_root(&self.identifier, &self.root_path)
    }

    /// 去掉根路径后的目录部分（Path）
    pub fn relative_path(&self) -> String {
        path::strip_root(path::parent_dir(&self.identifier), &self.root_path)
    }

    /// 叶子文件名（FileName）
    pub fn file_name(&self) -> &str {
        path::file_name(&self.identifier)
    }

    /// 服务器没有单独的创建时间，与修改时间相同
    pub fn date_created(&self) -> DateTime<Utc> {
        self.last_write_time_utc
    }

    pub fn date_modified(&self) -> DateTime<Utc> {
        self.last_write_time_utc
    }
}
