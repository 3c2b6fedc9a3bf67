pub mod local;
pub mod remote;

use crate::error::{Result, SyncError};
use crate::model::RemoteFileRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

pub use local::LocalSession;
pub use remote::RemoteSession;

// ============ 公共常量 ============

/// 非 IO 操作超时（秒）- stat, delete 等
pub const OP_TIMEOUT_SECS: u64 = 60;
/// IO 操作超时（秒）- read, write 等
pub const IO_TIMEOUT_SECS: u64 = 300;

/// 传输协议
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Sftp,
    Ftp,
    /// 本地目录充当服务器根目录
    Local,
}

impl Protocol {
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Sftp => 22,
            Protocol::Ftp => 21,
            Protocol::Local => 0,
        }
    }
}

/// FTP 加密模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FtpSecure {
    #[default]
    None,
    Implicit,
    Explicit,
}

/// 打开会话所需的连接参数
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub protocol: Protocol,
    pub host_name: String,
    /// 0 表示使用协议默认端口
    pub port_number: u16,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub ftp_secure: FtpSecure,
    pub accept_any_tls_host_certificate: bool,
    pub accept_any_ssh_host_key: bool,
    pub ssh_host_key_fingerprint: Option<String>,
    pub ssh_private_key_path: Option<String>,
    pub ssh_private_key_passphrase: Option<String>,
}

impl SessionOptions {
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Local,
            host_name: path.into(),
            ..Default::default()
        }
    }

    pub fn port(&self) -> u16 {
        if self.port_number == 0 {
            self.protocol.default_port()
        } else {
            self.port_number
        }
    }

    /// 用于日志的端点描述（不含凭据）
    pub fn endpoint(&self) -> String {
        match self.protocol {
            Protocol::Local => format!("local:{}", self.host_name),
            Protocol::Ftp => format!("ftp://{}:{}", self.host_name, self.port()),
            Protocol::Sftp => format!("sftp://{}:{}", self.host_name, self.port()),
        }
    }
}

/// 传输结果，失败不抛错，调用方必须显式检查
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferResult {
    pub failures: Vec<String>,
}

impl TransferResult {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            failures: vec![message.into()],
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// 失败时转换为 `TransferFailed`
    pub fn check(self, path: &str) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(SyncError::TransferFailed {
                path: path.to_string(),
                failures: self.failures,
            })
        }
    }
}

/// 上传选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOptions {
    pub overwrite: bool,
    pub preserve_timestamp: bool,
}

/// 传输会话接口
#[async_trait]
pub trait TransferSession: Send + Sync {
    /// 列出目录（不递归），`None` 视为空目录
    async fn list_directory(&self, path: &str) -> Result<Option<Vec<RemoteFileRecord>>>;

    /// 下载到本地文件
    async fn get_file(&self, remote_path: &str, local_path: &Path) -> Result<TransferResult>;

    /// 上传本地文件
    async fn put_file(
        &self,
        local_path: &Path,
        remote_path: &str,
        options: PutOptions,
    ) -> Result<TransferResult>;

    async fn remove_file(&self, remote_path: &str) -> Result<()>;

    /// 文件或目录是否存在
    async fn file_exists(&self, path: &str) -> Result<bool>;

    /// 创建单级目录，父目录必须已存在
    async fn create_directory(&self, path: &str) -> Result<()>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// 获取会话名称（用于日志）
    fn name(&self) -> &str;
}

/// 打开会话的入口，读取器和同步器共用
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn TransferSession>>;
}

#[async_trait]
impl SessionFactory for SessionOptions {
    async fn open(&self) -> Result<Box<dyn TransferSession>> {
        open_session(self).await
    }
}

/// 根据连接参数创建会话
pub async fn open_session(options: &SessionOptions) -> Result<Box<dyn TransferSession>> {
    let session: Box<dyn TransferSession> = match options.protocol {
        Protocol::Local => {
            info!("打开本地会话: {}", options.host_name);
            Box::new(LocalSession::open(&options.host_name)?)
        }
        Protocol::Ftp => {
            info!("打开 FTP 会话: {}", options.endpoint());
            Box::new(RemoteSession::ftp(options).await?)
        }
        Protocol::Sftp => {
            info!("打开 SFTP 会话: {}", options.endpoint());
            Box::new(RemoteSession::sftp(options).await?)
        }
    };
    Ok(session)
}

/// 关闭会话，关闭失败只记录日志
pub async fn close_session(session: Box<dyn TransferSession>) {
    if let Err(e) = session.close().await {
        warn!("关闭会话失败 ({}): {}", session.name(), e);
    } else {
        info!("会话已关闭: {}", session.name());
    }
}
