use crate::core::filter::{parse_threshold, FileFilter};
use crate::core::path;
use crate::core::scanner::{FileScanner, ScanConfig, ScanResult};
use crate::core::source::BlobSource;
use crate::core::staging::StagingFile;
use crate::core::status::{BatchPolicy, ContinueProbe};
use crate::core::writer::{Synchronizer, WriterConfig, DEFAULT_MAX_BLOB_SIZE_MB};
use crate::error::{Result, SyncError};
use crate::model::{ChangeItem, DataRow, DataTable, SchemaMap};
use crate::session::{close_session, SessionFactory};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 读取器配置
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub root_path: String,
    /// `;` 分隔的通配符列表
    pub filter_pattern: String,
    pub recurse_folders: bool,
    /// UTC 时间文本，空表示不限制
    pub modified_since: Option<String>,
    /// 路径列统一输出为 `/` 分隔
    pub web_friendly_paths: bool,
    pub staging_dir: PathBuf,
    pub max_blob_size: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            root_path: "/".to_string(),
            filter_pattern: "*.*".to_string(),
            recurse_folders: true,
            modified_since: None,
            web_friendly_paths: true,
            staging_dir: std::env::temp_dir(),
            max_blob_size: DEFAULT_MAX_BLOB_SIZE_MB * 1024 * 1024,
        }
    }
}

/// 远程数据集：把远程目录树暴露为以完整路径为 identifier 的行集合
pub struct RemoteReader {
    sessions: Arc<dyn SessionFactory>,
    config: ReaderConfig,
    continue_probe: Option<ContinueProbe>,
}

impl RemoteReader {
    pub fn new(sessions: Arc<dyn SessionFactory>, config: ReaderConfig) -> Self {
        Self {
            sessions,
            config,
            continue_probe: None,
        }
    }

    pub fn with_probe(mut self, probe: ContinueProbe) -> Self {
        self.continue_probe = Some(probe);
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn default_schema() -> SchemaMap {
        SchemaMap::default_schema()
    }

    /// 解析过滤器与时间阈值，配置错误在打开会话前暴露
    pub fn scan_config(&self) -> Result<ScanConfig> {
        Ok(ScanConfig {
            root_path: self.config.root_path.clone(),
            recursive: self.config.recurse_folders,
            modified_since: parse_threshold(self.config.modified_since.as_deref())?,
            filter: FileFilter::new(&self.config.filter_pattern)?,
        })
    }

    /// 扫描远程树，返回规范化后的行
    pub async fn scan(&self) -> Result<ScanResult> {
        let scan_config = self.scan_config()?;
        let scanner = match self.continue_probe {
            Some(ref probe) => FileScanner::with_probe(scan_config, probe.clone()),
            None => FileScanner::new(scan_config),
        };

        let session = self.sessions.open().await?;
        let result = scanner.scan(session.as_ref()).await;
        close_session(session).await;
        result
    }

    /// 按列映射投影扫描结果
    ///
    /// 被取消的扫描只覆盖了部分目录，不能当作完整数据集返回。
    pub async fn get_data_table(&self, schema: &SchemaMap) -> Result<DataTable> {
        let scanned = self.scan().await?;
        if scanned.cancelled {
            warn!("扫描被取消，丢弃已得到的 {} 行", scanned.rows.len());
            return Err(SyncError::Cancelled);
        }

        let mut table = DataTable::new();
        for row in &scanned.rows {
            let mut data_row = DataRow::new(row.identifier.clone());
            schema.project(row, self.config.web_friendly_paths, &mut data_row)?;
            if !table.add_with_identifier(data_row) {
                warn!("重复的 identifier，已忽略: {}", row.identifier);
            }
        }

        info!("数据表生成完成: {} 行", table.len());
        Ok(table)
    }

    /// 下载单个文件的内容
    ///
    /// 下载到暂存文件后读入内存，暂存文件在返回前删除。
    pub async fn get_blob_data_by_identifier(&self, identifier: &str) -> Result<Vec<u8>> {
        let session = self.sessions.open().await?;
        let staged = StagingFile::reserve(&self.config.staging_dir);

        let result = async {
            debug!("下载 {} 到 {:?}", identifier, staged.path());
            session
                .get_file(identifier, staged.path())
                .await?
                .check(identifier)?;

            let size = staged.size().await?;
            if size > self.config.max_blob_size {
                return Err(SyncError::Oversize {
                    path: identifier.to_string(),
                    size,
                    limit: self.config.max_blob_size,
                });
            }
            staged.read().await
        }
        .await;

        close_session(session).await;
        result
    }

    /// identifier 的文件名部分
    pub fn get_file_name(&self, identifier: &str) -> String {
        path::file_name(identifier).to_string()
    }

    /// identifier 所在目录相对于根目录的路径
    pub fn get_file_path(&self, identifier: &str) -> String {
        let relative = path::strip_root(path::parent_dir(identifier), &self.config.root_path);
        path::to_display_path(&relative, self.config.web_friendly_paths)
    }

    /// 以该数据集为目标的同步器，共用会话参数和根目录
    pub fn writer(&self, policy: BatchPolicy) -> Synchronizer {
        Synchronizer::new(
            self.sessions.clone(),
            WriterConfig {
                root_path: self.config.root_path.clone(),
                staging_dir: self.config.staging_dir.clone(),
                max_blob_size: self.config.max_blob_size,
                policy,
            },
        )
    }
}

#[async_trait]
impl BlobSource for RemoteReader {
    async fn get_blob_data(&self, item: &ChangeItem) -> Result<Vec<u8>> {
        let identifier = item
            .source_identifier
            .as_deref()
            .ok_or_else(|| SyncError::InvalidItem("缺少 source identifier".to_string()))?;
        self.get_blob_data_by_identifier(identifier).await
    }
}
