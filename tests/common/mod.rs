#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use filetime::FileTime;
use ftpsync::core::path;
use ftpsync::core::{BlobSource, SyncStatus};
use ftpsync::error::{Result, SyncError};
use ftpsync::model::{ChangeItem, RemoteFileRecord};
use ftpsync::session::{PutOptions, SessionFactory, TransferResult, TransferSession};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// 会话调用记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    Get(String),
    Put { path: String, overwrite: bool },
    Remove(String),
    Exists(String),
    CreateDir(String),
    Close,
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub data: Vec<u8>,
    pub modified: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    files: BTreeMap<String, StoredFile>,
    dirs: BTreeSet<String>,
    calls: Vec<Call>,
    fail_put: HashSet<String>,
    fail_list: HashSet<String>,
    fail_create: HashSet<String>,
    reverse_listing: bool,
    pseudo_entries: bool,
    opened: usize,
}

/// 内存中的远程服务器，记录所有调用
#[derive(Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<State>>,
}

pub fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加目录及其所有祖先
    pub fn with_dir(self, dir: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let segments = path::segments(dir);
            for level in 1..=segments.len() {
                state.dirs.insert(path::prefix_path(&segments, level));
            }
        }
        self
    }

    pub fn with_file(self, file: &str, data: &[u8], modified: DateTime<Utc>) -> Self {
        let server = self.with_dir(path::parent_dir(file));
        server.state.lock().unwrap().files.insert(
            file.to_string(),
            StoredFile {
                data: data.to_vec(),
                modified,
            },
        );
        server
    }

    pub fn fail_put(self, file: &str) -> Self {
        self.state.lock().unwrap().fail_put.insert(file.to_string());
        self
    }

    pub fn fail_list(self, dir: &str) -> Self {
        self.state.lock().unwrap().fail_list.insert(dir.to_string());
        self
    }

    pub fn fail_create(self, dir: &str) -> Self {
        self.state.lock().unwrap().fail_create.insert(dir.to_string());
        self
    }

    /// 列目录时倒序返回
    pub fn reverse_listing(self) -> Self {
        self.state.lock().unwrap().reverse_listing = true;
        self
    }

    /// 列目录时附带 `.` 和 `..`
    pub fn pseudo_entries(self) -> Self {
        self.state.lock().unwrap().pseudo_entries = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn created_dirs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateDir(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn file(&self, path: &str) -> Option<StoredFile> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(path)
    }

    pub fn opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Close).count()
    }

    pub fn factory(&self) -> Arc<dyn SessionFactory> {
        Arc::new(self.clone())
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn dir_exists(state: &State, dir: &str) -> bool {
        dir == "/" || state.dirs.contains(dir)
    }
}

#[async_trait]
impl SessionFactory for MemoryServer {
    async fn open(&self) -> Result<Box<dyn TransferSession>> {
        self.state.lock().unwrap().opened += 1;
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl TransferSession for MemoryServer {
    async fn list_directory(&self, dir: &str) -> Result<Option<Vec<RemoteFileRecord>>> {
        self.record(Call::List(dir.to_string()));
        let state = self.state.lock().unwrap();
        if state.fail_list.contains(dir) {
            return Err(SyncError::remote(dir, "550 Permission denied"));
        }
        if !Self::dir_exists(&state, dir) {
            return Ok(None);
        }

        let mut records = Vec::new();
        if state.pseudo_entries {
            records.push(RemoteFileRecord::directory(path::combine(dir, "."), utc(2000, 1, 1)));
            records.push(RemoteFileRecord::directory(path::combine(dir, ".."), utc(2000, 1, 1)));
        }
        for sub in state.dirs.iter().filter(|d| path::parent_dir(d) == dir) {
            records.push(RemoteFileRecord::directory(sub.clone(), utc(2000, 1, 1)));
        }
        for (name, file) in state.files.iter().filter(|(f, _)| path::parent_dir(f) == dir) {
            records.push(RemoteFileRecord::file(
                name.clone(),
                file.modified,
                file.data.len() as u64,
            ));
        }
        if state.reverse_listing {
            records.reverse();
        }
        Ok(Some(records))
    }

    async fn get_file(&self, remote_path: &str, local_path: &Path) -> Result<TransferResult> {
        self.record(Call::Get(remote_path.to_string()));
        let data = match self.file(remote_path) {
            Some(file) => file.data,
            None => return Ok(TransferResult::failed(format!("550 {}: not found", remote_path))),
        };
        std::fs::write(local_path, data)?;
        Ok(TransferResult::success())
    }

    async fn put_file(
        &self,
        local_path: &Path,
        remote_path: &str,
        options: PutOptions,
    ) -> Result<TransferResult> {
        self.record(Call::Put {
            path: remote_path.to_string(),
            overwrite: options.overwrite,
        });

        let data = std::fs::read(local_path)?;
        let modified = if options.preserve_timestamp {
            let metadata = std::fs::metadata(local_path)?;
            let mtime = FileTime::from_last_modification_time(&metadata);
            Utc.timestamp_opt(mtime.unix_seconds(), 0).unwrap()
        } else {
            Utc::now()
        };

        let mut state = self.state.lock().unwrap();
        if state.fail_put.contains(remote_path) {
            return Ok(TransferResult::failed("451 Local error in processing"));
        }
        if !options.overwrite && state.files.contains_key(remote_path) {
            return Ok(TransferResult::failed("553 File exists"));
        }
        if !Self::dir_exists(&state, path::parent_dir(remote_path)) {
            return Ok(TransferResult::failed("553 No such directory"));
        }
        state
            .files
            .insert(remote_path.to_string(), StoredFile { data, modified });
        Ok(TransferResult::success())
    }

    async fn remove_file(&self, remote_path: &str) -> Result<()> {
        self.record(Call::Remove(remote_path.to_string()));
        match self.state.lock().unwrap().files.remove(remote_path) {
            Some(_) => Ok(()),
            None => Err(SyncError::remote(remote_path, "550 No such file")),
        }
    }

    async fn file_exists(&self, target: &str) -> Result<bool> {
        self.record(Call::Exists(target.to_string()));
        let state = self.state.lock().unwrap();
        Ok(Self::dir_exists(&state, target) || state.files.contains_key(target))
    }

    async fn create_directory(&self, dir: &str) -> Result<()> {
        self.record(Call::CreateDir(dir.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.fail_create.contains(dir) {
            return Err(SyncError::remote(dir, "550 Permission denied"));
        }
        if !Self::dir_exists(&state, path::parent_dir(dir)) {
            return Err(SyncError::remote(dir, "550 Parent missing"));
        }
        if !state.dirs.insert(dir.to_string()) {
            return Err(SyncError::remote(dir, "550 Already exists"));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(Call::Close);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// 内存源数据集
#[derive(Default)]
pub struct MemorySource {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn with(mut self, identifier: &str, data: &[u8]) -> Self {
        self.blobs.insert(identifier.to_string(), data.to_vec());
        self
    }
}

#[async_trait]
impl BlobSource for MemorySource {
    async fn get_blob_data(&self, item: &ChangeItem) -> Result<Vec<u8>> {
        let id = item.source_identifier.clone().unwrap_or_default();
        self.blobs
            .get(&id)
            .cloned()
            .ok_or_else(|| SyncError::remote(id, "source missing"))
    }
}

/// 记录进度和错误信息，可在处理若干项后请求停止
#[derive(Default)]
pub struct RecordingStatus {
    progress: Mutex<Vec<(usize, usize)>>,
    messages: Mutex<Vec<String>>,
    stop_after: Option<usize>,
}

impl RecordingStatus {
    pub fn stop_after(items: usize) -> Self {
        Self {
            stop_after: Some(items),
            ..Default::default()
        }
    }

    pub fn progress_calls(&self) -> Vec<(usize, usize)> {
        self.progress.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl SyncStatus for RecordingStatus {
    fn log_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn progress(&self, total: usize, current: usize) {
        self.progress.lock().unwrap().push((total, current));
    }

    fn continue_processing(&self) -> bool {
        match self.stop_after {
            Some(limit) => self.progress.lock().unwrap().len() < limit,
            None => true,
        }
    }
}

/// 暂存目录中剩余的文件数
pub fn staged_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
