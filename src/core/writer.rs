use crate::core::materializer::DirectoryMaterializer;
use crate::core::path;
use crate::core::source::BlobSource;
use crate::core::staging::StagingFile;
use crate::core::status::{BatchPolicy, NoHooks, SyncHooks, SyncStatus};
use crate::error::{Result, SyncError};
use crate::model::{ChangeItem, ChangeSet};
use crate::session::{close_session, PutOptions, SessionFactory, TransferSession};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 默认单文件上限（MB）
pub const DEFAULT_MAX_BLOB_SIZE_MB: u64 = 2047;

/// 同步器配置
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// 目标根目录，新增项的目标路径相对于此
    pub root_path: String,
    /// 本地暂存目录
    pub staging_dir: PathBuf,
    /// 单文件大小上限（字节）
    pub max_blob_size: u64,
    pub policy: BatchPolicy,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            root_path: "/".to_string(),
            staging_dir: std::env::temp_dir(),
            max_blob_size: DEFAULT_MAX_BLOB_SIZE_MB * 1024 * 1024,
            policy: BatchPolicy::default(),
        }
    }
}

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Update,
    Delete,
}

impl ChangeKind {
    fn label(self) -> &'static str {
        match self {
            ChangeKind::Add => "新增",
            ChangeKind::Update => "更新",
            ChangeKind::Delete => "删除",
        }
    }
}

/// 同步报告
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub start_time: i64,
    pub end_time: i64,
    pub added: u32,
    pub updated: u32,
    pub deleted: u32,
    /// 未带待同步标记而跳过的项
    pub skipped: u32,
    pub failed: u32,
    /// 因取消而未处理
    pub cancelled: bool,
    /// 耗时（毫秒）
    pub duration: u64,
    pub errors: Vec<String>,
}

impl BatchReport {
    fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Add => self.added += 1,
            ChangeKind::Update => self.updated += 1,
            ChangeKind::Delete => self.deleted += 1,
        }
    }
}

/// 把一批变更应用到目标服务器
pub struct Synchronizer {
    sessions: Arc<dyn SessionFactory>,
    config: WriterConfig,
    hooks: Arc<dyn SyncHooks>,
}

impl Synchronizer {
    pub fn new(sessions: Arc<dyn SessionFactory>, config: WriterConfig) -> Self {
        Self {
            sessions,
            config,
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn SyncHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// 执行一批变更：先新增，再更新，最后删除
    ///
    /// 整批共用一个会话，无论成功、失败还是取消都会关闭。
    /// 处理过的项都会清除待同步标记。
    pub async fn execute(
        &self,
        changes: &mut ChangeSet,
        source: &dyn BlobSource,
        status: &dyn SyncStatus,
    ) -> Result<BatchReport> {
        let start = Instant::now();
        let mut report = BatchReport {
            start_time: chrono::Utc::now().timestamp(),
            ..Default::default()
        };

        info!(
            "开始同步: {} 个新增, {} 个更新, {} 个删除",
            changes.added.len(),
            changes.updated.len(),
            changes.deleted.len()
        );

        let session = self.sessions.open().await?;
        let result = self
            .apply(session.as_ref(), changes, source, status, &mut report)
            .await;
        close_session(session).await;

        report.end_time = chrono::Utc::now().timestamp();
        report.duration = start.elapsed().as_millis() as u64;
        result?;

        info!(
            "同步完成: 新增 {}, 更新 {}, 删除 {}, 跳过 {}, 失败 {}, 耗时 {}ms",
            report.added,
            report.updated,
            report.deleted,
            report.skipped,
            report.failed,
            report.duration
        );
        Ok(report)
    }

    async fn apply(
        &self,
        session: &dyn TransferSession,
        changes: &mut ChangeSet,
        source: &dyn BlobSource,
        status: &dyn SyncStatus,
        report: &mut BatchReport,
    ) -> Result<()> {
        let mut dirs = DirectoryMaterializer::new();
        let batches = [
            (ChangeKind::Add, &mut changes.added),
            (ChangeKind::Update, &mut changes.updated),
            (ChangeKind::Delete, &mut changes.deleted),
        ];

        for (kind, items) in batches {
            if items.is_empty() {
                continue;
            }
            if !status.continue_processing() {
                report.cancelled = true;
                break;
            }
            self.process_items(kind, session, items, source, status, &mut dirs, report)
                .await?;
        }

        if report.cancelled {
            info!("同步已取消");
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_items(
        &self,
        kind: ChangeKind,
        session: &dyn TransferSession,
        items: &mut [ChangeItem],
        source: &dyn BlobSource,
        status: &dyn SyncStatus,
        dirs: &mut DirectoryMaterializer,
        report: &mut BatchReport,
    ) -> Result<()> {
        let total = items.len();

        for (index, item) in items.iter_mut().enumerate() {
            if !status.continue_processing() {
                report.cancelled = true;
                break;
            }

            // 无论结果如何都上报进度
            let current = index + 1;
            scopeguard::defer! {
                status.progress(total, current);
            }

            let outcome = self.process_item(kind, session, item, source, dirs).await;
            item.clear_sync();

            match outcome {
                Ok(true) => report.record(kind),
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    report.errors.push(e.to_string());
                    self.handle_error(kind, status, e)?;
                }
            }
        }

        Ok(())
    }

    /// 单项失败的统一出口
    fn handle_error(&self, kind: ChangeKind, status: &dyn SyncStatus, err: SyncError) -> Result<()> {
        if self.config.policy.fail_on_error || err.is_fatal() {
            error!("{}失败，中止同步: {}", kind.label(), err);
            return Err(err);
        }
        warn!("{}失败: {}", kind.label(), err);
        status.log_message(&err.to_string());
        Ok(())
    }

    /// 返回 Ok(false) 表示该项未带待同步标记
    async fn process_item(
        &self,
        kind: ChangeKind,
        session: &dyn TransferSession,
        item: &ChangeItem,
        source: &dyn BlobSource,
        dirs: &mut DirectoryMaterializer,
    ) -> Result<bool> {
        let target = match self.resolve_target(kind, item) {
            Ok(target) => target,
            Err(e) => {
                self.hooks.error_item(item, "", &e);
                return Err(e);
            }
        };

        match kind {
            ChangeKind::Add => self.hooks.before_add_item(item, &target),
            ChangeKind::Update => self.hooks.before_update_item(item, &target),
            ChangeKind::Delete => self.hooks.before_delete_item(item, &target),
        }

        if !item.is_pending() {
            debug!("跳过未标记的{}项: {}", kind.label(), target);
            return Ok(false);
        }

        let result = match kind {
            ChangeKind::Add => self.add_item(session, item, &target, source, dirs).await,
            ChangeKind::Update => self.update_item(session, item, &target, source).await,
            ChangeKind::Delete => session.remove_file(&target).await,
        };

        match result {
            Ok(()) => {
                debug!("{}完成: {}", kind.label(), target);
                match kind {
                    ChangeKind::Add => self.hooks.after_add_item(item, &target),
                    ChangeKind::Update => self.hooks.after_update_item(item, &target),
                    ChangeKind::Delete => self.hooks.after_delete_item(item, &target),
                }
                Ok(true)
            }
            Err(e) => {
                self.hooks.error_item(item, &target, &e);
                Err(e)
            }
        }
    }

    /// 新增项由根目录和声明的文件名得到，更新/删除项直接使用目标 identifier
    ///
    /// 含 `.`/`..` 段的目标会越出根目录，按无效项处理。
    fn resolve_target(&self, kind: ChangeKind, item: &ChangeItem) -> Result<String> {
        let target = match kind {
            ChangeKind::Add => {
                let name = item.declared_file_name().ok_or_else(|| {
                    SyncError::InvalidItem("新增项缺少 FullFileName/FileName".to_string())
                })?;
                path::combine(&self.config.root_path, &path::ensure_web_path(name))
            }
            ChangeKind::Update | ChangeKind::Delete => item
                .target_identifier
                .clone()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    SyncError::InvalidItem(format!("{}项缺少目标 identifier", kind.label()))
                })?,
        };

        if path::checked_segments(&target).is_none() {
            return Err(SyncError::InvalidItem(format!(
                "{}项路径包含 . 或 .. 段: {}",
                kind.label(),
                target
            )));
        }
        Ok(target)
    }

    async fn add_item(
        &self,
        session: &dyn TransferSession,
        item: &ChangeItem,
        target: &str,
        source: &dyn BlobSource,
        dirs: &mut DirectoryMaterializer,
    ) -> Result<()> {
        let staged = self.stage(item, target, source).await?;
        dirs.ensure(session, path::parent_dir(target)).await?;

        let options = PutOptions {
            overwrite: false,
            preserve_timestamp: true,
        };
        session
            .put_file(staged.path(), target, options)
            .await?
            .check(target)
    }

    /// 目标已存在，不创建目录
    async fn update_item(
        &self,
        session: &dyn TransferSession,
        item: &ChangeItem,
        target: &str,
        source: &dyn BlobSource,
    ) -> Result<()> {
        let staged = self.stage(item, target, source).await?;

        let options = PutOptions {
            overwrite: true,
            preserve_timestamp: true,
        };
        session
            .put_file(staged.path(), target, options)
            .await?
            .check(target)
    }

    /// 读取源内容写入暂存文件，并设置修改时间
    async fn stage(
        &self,
        item: &ChangeItem,
        target: &str,
        source: &dyn BlobSource,
    ) -> Result<StagingFile> {
        let data = source.get_blob_data(item).await?;
        let size = data.len() as u64;
        if size > self.config.max_blob_size {
            return Err(SyncError::Oversize {
                path: target.to_string(),
                size,
                limit: self.config.max_blob_size,
            });
        }

        let staged = StagingFile::create(&self.config.staging_dir, &data).await?;
        if let Some(modified) = item.date_modified {
            staged.set_modified(modified)?;
        }
        Ok(staged)
    }
}
