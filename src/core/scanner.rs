use crate::core::filter::{within_window, FileFilter};
use crate::core::path;
use crate::core::status::{cancel_probe, ContinueProbe};
use crate::error::Result;
use crate::model::{NormalizedRow, RemoteFileRecord};
use crate::session::TransferSession;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

/// 远程树扫描配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 扫描根目录，相对路径均以此为基准
    pub root_path: String,
    /// 是否进入子目录
    pub recursive: bool,
    /// 只保留修改时间不早于该时刻的文件
    pub modified_since: Option<DateTime<Utc>>,
    /// 作用于相对路径的文件名过滤
    pub filter: FileFilter,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root_path: "/".to_string(),
            recursive: true,
            modified_since: None,
            filter: FileFilter::default(),
        }
    }
}

/// 扫描结果
#[derive(Debug, Default)]
pub struct ScanResult {
    /// 按遍历顺序排列，identifier 唯一
    pub rows: Vec<NormalizedRow>,
    pub directories: usize,
    pub excluded: usize,
    /// 为 true 时 rows 只包含取消前已经扫描到的部分
    pub cancelled: bool,
}

/// 远程树扫描器
pub struct FileScanner {
    config: ScanConfig,
    continue_probe: Option<ContinueProbe>,
}

impl FileScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            continue_probe: None,
        }
    }

    pub fn with_probe(config: ScanConfig, probe: ContinueProbe) -> Self {
        Self {
            config,
            continue_probe: Some(probe),
        }
    }

    /// 创建带取消标志的扫描器
    pub fn with_cancel(config: ScanConfig, cancel_flag: Arc<AtomicBool>) -> Self {
        Self::with_probe(config, cancel_probe(cancel_flag))
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn should_continue(&self) -> bool {
        self.continue_probe.as_ref().map(|probe| probe()).unwrap_or(true)
    }

    /// 深度优先遍历，同一目录内保持服务器返回顺序
    ///
    /// 使用显式栈代替递归，目录深度不受调用栈限制。
    /// 列目录失败直接返回错误；取消时返回已经得到的行。
    pub async fn scan(&self, session: &dyn TransferSession) -> Result<ScanResult> {
        let root: Arc<str> = Arc::from(self.config.root_path.as_str());
        info!(
            "开始扫描: {}{}, 过滤: {:?}, 递归: {}",
            session.name(),
            root,
            self.config.filter.source(),
            self.config.recursive
        );

        let mut result = ScanResult::default();
        if !self.should_continue() {
            info!("扫描已取消");
            result.cancelled = true;
            return Ok(result);
        }

        let mut seen = HashSet::new();
        let listing = session.list_directory(&root).await?.unwrap_or_default();
        let mut stack: Vec<std::vec::IntoIter<RemoteFileRecord>> = vec![listing.into_iter()];

        while let Some(entries) = stack.last_mut() {
            let Some(record) = entries.next() else {
                stack.pop();
                continue;
            };

            if record.is_directory {
                if !self.config.recursive || record.is_pseudo_entry() {
                    continue;
                }
                if !self.should_continue() {
                    info!("扫描已取消，已得到 {} 个文件", result.rows.len());
                    result.cancelled = true;
                    break;
                }
                result.directories += 1;
                debug!("进入目录: {}", record.full_remote_path);
                let children = session
                    .list_directory(&record.full_remote_path)
                    .await?
                    .unwrap_or_default();
                stack.push(children.into_iter());
                continue;
            }

            match self.accept(&record, &root) {
                Some(row) => {
                    if seen.insert(row.identifier.clone()) {
                        result.rows.push(row);
                    }
                }
                None => {
                    debug!("排除文件: {}", record.full_remote_path);
                    result.excluded += 1;
                }
            }
        }

        info!(
            "扫描完成: {} 个文件, {} 个目录, {} 个被排除",
            result.rows.len(),
            result.directories,
            result.excluded
        );

        Ok(result)
    }

    /// 过滤器和时间窗口同时满足才保留
    fn accept(&self, record: &RemoteFileRecord, root: &Arc<str>) -> Option<NormalizedRow> {
        let relative = path::strip_root(&record.full_remote_path, root);
        if !self.config.filter.matches(&relative) {
            return None;
        }
        if !within_window(record.last_write_time_utc, self.config.modified_since) {
            return None;
        }
        Some(NormalizedRow::new(record, root.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{PutOptions, TransferResult};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    /// 只支持列目录的内存会话
    #[derive(Default)]
    struct TreeSession {
        dirs: HashMap<String, Vec<RemoteFileRecord>>,
        listed: Mutex<Vec<String>>,
    }

    impl TreeSession {
        fn dir(mut self, path: &str, entries: Vec<RemoteFileRecord>) -> Self {
            self.dirs.insert(path.to_string(), entries);
            self
        }

        fn listed(&self) -> Vec<String> {
            self.listed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TransferSession for TreeSession {
        async fn list_directory(&self, path: &str) -> Result<Option<Vec<RemoteFileRecord>>> {
            self.listed.lock().unwrap().push(path.to_string());
            Ok(self.dirs.get(path).cloned())
        }

        async fn get_file(&self, _: &str, _: &Path) -> Result<TransferResult> {
            unimplemented!()
        }

        async fn put_file(&self, _: &Path, _: &str, _: PutOptions) -> Result<TransferResult> {
            unimplemented!()
        }

        async fn remove_file(&self, _: &str) -> Result<()> {
            unimplemented!()
        }

        async fn file_exists(&self, _: &str) -> Result<bool> {
            unimplemented!()
        }

        async fn create_directory(&self, _: &str) -> Result<()> {
            unimplemented!()
        }

        fn name(&self) -> &str {
            "tree"
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn sample_tree() -> TreeSession {
        TreeSession::default()
            .dir(
                "/data",
                vec![
                    RemoteFileRecord::directory("/data/.", at(1)),
                    RemoteFileRecord::directory("/data/..", at(1)),
                    RemoteFileRecord::file("/data/a.csv", at(2), 10),
                    RemoteFileRecord::directory("/data/sub", at(1)),
                    RemoteFileRecord::file("/data/z.txt", at(3), 5),
                ],
            )
            .dir(
                "/data/sub",
                vec![RemoteFileRecord::file("/data/sub/b.csv", at(4), 7)],
            )
    }

    fn config(filter: &str) -> ScanConfig {
        ScanConfig {
            root_path: "/data".to_string(),
            filter: FileFilter::new(filter).unwrap(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_preorder_with_pseudo_entries_skipped() {
        let session = sample_tree();
        let result = FileScanner::new(config("*.*")).scan(&session).await.unwrap();

        let ids: Vec<_> = result.rows.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["/data/a.csv", "/data/sub/b.csv", "/data/z.txt"]);
        assert_eq!(session.listed(), vec!["/data", "/data/sub"]);
        assert_eq!(result.directories, 1);
        assert!(!result.cancelled);
    }

    #[tokio::test]
    async fn test_filter_applies_to_relative_path() {
        let session = sample_tree();
        let result = FileScanner::new(config("sub/*.csv")).scan(&session).await.unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].identifier, "/data/sub/b.csv");
        assert_eq!(result.excluded, 2);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let session = sample_tree();
        let mut cfg = config("*");
        cfg.modified_since = Some(at(3));
        let result = FileScanner::new(cfg).scan(&session).await.unwrap();
        let ids: Vec<_> = result.rows.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["/data/sub/b.csv", "/data/z.txt"]);
    }

    #[tokio::test]
    async fn test_non_recursive_does_not_descend() {
        let session = sample_tree();
        let mut cfg = config("*");
        cfg.recursive = false;
        let result = FileScanner::new(cfg).scan(&session).await.unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(session.listed(), vec!["/data"]);
    }

    #[tokio::test]
    async fn test_missing_listing_is_empty() {
        let session = TreeSession::default();
        let result = FileScanner::new(config("*")).scan(&session).await.unwrap();
        assert!(result.rows.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_descending() {
        let session = sample_tree();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        // 允许扫描根目录，拒绝进入子目录
        let probe: ContinueProbe = Arc::new(move || {
            let mut n = counter.lock().unwrap();
            *n += 1;
            *n == 1
        });

        let result = FileScanner::with_probe(config("*"), probe)
            .scan(&session)
            .await
            .unwrap();
        assert!(result.cancelled);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].identifier, "/data/a.csv");
        assert_eq!(session.listed(), vec!["/data"]);
    }
}
