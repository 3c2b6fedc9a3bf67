//! 同步任务配置模块

use crate::core::filter::parse_threshold;
use crate::core::reader::{ReaderConfig, RemoteReader};
use crate::core::status::BatchPolicy;
use crate::core::writer::DEFAULT_MAX_BLOB_SIZE_MB;
use crate::error::Result as SyncResult;
use crate::logging::LogConfig;
use crate::session::{FtpSecure, Protocol, SessionOptions};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 一次同步周期的配置，加载后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    /// 远程根目录
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_filter_pattern")]
    pub filter_pattern: String,
    #[serde(default = "default_true")]
    pub recurse_folders: bool,
    /// 只同步该时刻之后修改的文件（UTC）
    #[serde(default)]
    pub modified_since_utc: Option<String>,
    #[serde(default = "default_true")]
    pub web_friendly_paths: bool,

    // ============ 连接 ============
    #[serde(default)]
    pub protocol: Protocol,
    /// local 协议下为充当服务器的本地目录
    #[serde(default)]
    pub host_name: String,
    /// 0 表示协议默认端口
    #[serde(default)]
    pub port_number: u16,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ftp_secure: FtpSecure,
    #[serde(default)]
    pub accept_any_tls_host_certificate: bool,
    #[serde(default)]
    pub accept_any_ssh_host_key: bool,
    #[serde(default)]
    pub ssh_host_key_fingerprint: Option<String>,
    #[serde(default)]
    pub ssh_private_key_path: Option<String>,
    #[serde(default)]
    pub ssh_private_key_passphrase: Option<String>,

    // ============ 同步 ============
    /// 任一项失败即中止整批
    #[serde(default)]
    pub fail_on_error: bool,
    /// 暂存目录，默认系统临时目录
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    #[serde(default = "default_max_blob_size_mb")]
    pub max_blob_size_mb: u64,

    #[serde(default)]
    pub log: LogConfig,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_filter_pattern() -> String {
    "*.*".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_blob_size_mb() -> u64 {
    DEFAULT_MAX_BLOB_SIZE_MB
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            filter_pattern: default_filter_pattern(),
            recurse_folders: true,
            modified_since_utc: None,
            web_friendly_paths: true,
            protocol: Protocol::default(),
            host_name: String::new(),
            port_number: 0,
            user_name: None,
            password: None,
            ftp_secure: FtpSecure::default(),
            accept_any_tls_host_certificate: false,
            accept_any_ssh_host_key: false,
            ssh_host_key_fingerprint: None,
            ssh_private_key_path: None,
            ssh_private_key_passphrase: None,
            fail_on_error: false,
            staging_dir: None,
            max_blob_size_mb: default_max_blob_size_mb(),
            log: LogConfig::default(),
        }
    }
}

impl JobConfig {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {:?}", path))?;
        let config: JobConfig = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {:?}", path))?;
        Ok(config)
    }

    pub fn modified_since(&self) -> SyncResult<Option<DateTime<Utc>>> {
        parse_threshold(self.modified_since_utc.as_deref())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            protocol: self.protocol,
            host_name: self.host_name.clone(),
            port_number: self.port_number,
            user_name: self.user_name.clone(),
            password: self.password.clone(),
            ftp_secure: self.ftp_secure,
            accept_any_tls_host_certificate: self.accept_any_tls_host_certificate,
            accept_any_ssh_host_key: self.accept_any_ssh_host_key,
            ssh_host_key_fingerprint: self.ssh_host_key_fingerprint.clone(),
            ssh_private_key_path: self.ssh_private_key_path.clone(),
            ssh_private_key_passphrase: self.ssh_private_key_passphrase.clone(),
        }
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn max_blob_size(&self) -> u64 {
        self.max_blob_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn policy(&self) -> BatchPolicy {
        BatchPolicy {
            fail_on_error: self.fail_on_error,
        }
    }

    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            root_path: self.path.clone(),
            filter_pattern: self.filter_pattern.clone(),
            recurse_folders: self.recurse_folders,
            modified_since: self.modified_since_utc.clone(),
            web_friendly_paths: self.web_friendly_paths,
            staging_dir: self.staging_dir(),
            max_blob_size: self.max_blob_size(),
        }
    }

    /// 以配置的连接参数创建读取器
    pub fn reader(&self) -> RemoteReader {
        RemoteReader::new(Arc::new(self.session_options()), self.reader_config())
    }
}
