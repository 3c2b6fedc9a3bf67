use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 上游比对得到的一条变更
///
/// 目标数据已按列映射转换为目标列名（FullFileName、FileName、DateModified）。
/// 同步器只读取这些字段，处理完成后清除 `sync` 标记。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeItem {
    /// 源数据集中的 identifier，用于读取源文件内容
    #[serde(default)]
    pub source_identifier: Option<String>,
    /// 目标数据集中已分配的 identifier（更新/删除时使用）
    #[serde(default)]
    pub target_identifier: Option<String>,
    #[serde(default)]
    pub full_file_name: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub date_modified: Option<DateTime<Utc>>,
    /// 待同步标记
    #[serde(default = "default_sync")]
    sync: bool,
}

fn default_sync() -> bool {
    true
}

impl ChangeItem {
    /// 新增项，目标路径由文件名推导
    pub fn add(source_identifier: impl Into<String>, full_file_name: impl Into<String>) -> Self {
        Self {
            source_identifier: Some(source_identifier.into()),
            target_identifier: None,
            full_file_name: Some(full_file_name.into()),
            file_name: None,
            date_modified: None,
            sync: true,
        }
    }

    /// 更新项，目标路径为已有 identifier
    pub fn update(
        source_identifier: impl Into<String>,
        target_identifier: impl Into<String>,
    ) -> Self {
        Self {
            source_identifier: Some(source_identifier.into()),
            target_identifier: Some(target_identifier.into()),
            full_file_name: None,
            file_name: None,
            date_modified: None,
            sync: true,
        }
    }

    pub fn delete(target_identifier: impl Into<String>) -> Self {
        Self {
            source_identifier: None,
            target_identifier: Some(target_identifier.into()),
            full_file_name: None,
            file_name: None,
            date_modified: None,
            sync: true,
        }
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.date_modified = Some(modified);
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// 标记为不需要同步（仍会计入进度）
    pub fn skipped(mut self) -> Self {
        self.sync = false;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.sync
    }

    /// 清除待同步标记
    pub fn clear_sync(&mut self) {
        self.sync = false;
    }

    /// 新增时使用的文件名：优先 FullFileName，其次 FileName
    pub fn declared_file_name(&self) -> Option<&str> {
        self.full_file_name
            .as_deref()
            .or(self.file_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

/// 一批变更
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    #[serde(default)]
    pub added: Vec<ChangeItem>,
    #[serde(default)]
    pub updated: Vec<ChangeItem>,
    #[serde(default)]
    pub deleted: Vec<ChangeItem>,
}

impl ChangeSet {
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 仍带有待同步标记的项数
    pub fn pending(&self) -> usize {
        self.added
            .iter()
            .chain(&self.updated)
            .chain(&self.deleted)
            .filter(|item| item.is_pending())
            .count()
    }
}
