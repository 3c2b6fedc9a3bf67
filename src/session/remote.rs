use super::{
    FtpSecure, PutOptions, SessionOptions, TransferResult, TransferSession, IO_TIMEOUT_SECS,
    OP_TIMEOUT_SECS,
};
use crate::core::path;
use crate::error::{Result, SyncError};
use crate::model::RemoteFileRecord;
use async_trait::async_trait;
use futures::TryStreamExt;
use opendal::{layers::TimeoutLayer, Metakey, Operator};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// 基于 opendal 的 FTP/SFTP 会话，operator 根目录为 `/`
pub struct RemoteSession {
    operator: Operator,
    name: String,
}

impl RemoteSession {
    pub async fn ftp(options: &SessionOptions) -> Result<Self> {
        use opendal::services::Ftp;

        let scheme = match options.ftp_secure {
            FtpSecure::None => "ftp",
            FtpSecure::Explicit => "ftps",
            FtpSecure::Implicit => {
                warn!("不支持隐式 FTPS，改用显式 FTPS (AUTH TLS)");
                "ftps"
            }
        };
        if options.accept_any_tls_host_certificate {
            warn!("FTP 会话不支持跳过 TLS 证书校验，已忽略该选项");
        }

        let mut builder = Ftp::default()
            .endpoint(&format!("{}://{}:{}", scheme, options.host_name, options.port()))
            .root("/");
        if let Some(ref user) = options.user_name {
            builder = builder.user(user);
        }
        if let Some(ref password) = options.password {
            builder = builder.password(password);
        }

        let endpoint = options.endpoint();
        let operator = Operator::new(builder)
            .map_err(|e| SyncError::connection(&endpoint, e))?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();

        Self::connect(operator, endpoint).await
    }

    #[cfg(unix)]
    pub async fn sftp(options: &SessionOptions) -> Result<Self> {
        use opendal::services::Sftp;

        let strategy = if options.accept_any_ssh_host_key {
            "Accept"
        } else {
            "Strict"
        };
        if options.ssh_host_key_fingerprint.is_some() {
            warn!("SFTP 会话使用 known_hosts 校验主机密钥，已忽略指定的指纹");
        }
        if options.ssh_private_key_passphrase.is_some() {
            warn!("SFTP 会话不支持私钥口令，请使用 ssh-agent 加载私钥");
        }
        if options.password.is_some() && options.ssh_private_key_path.is_none() {
            warn!("SFTP 会话不支持密码认证，将使用 ssh-agent 或默认私钥");
        }

        let mut builder = Sftp::default()
            .endpoint(&format!("ssh://{}:{}", options.host_name, options.port()))
            .root("/")
            .known_hosts_strategy(strategy);
        if let Some(ref user) = options.user_name {
            builder = builder.user(user);
        }
        if let Some(ref key) = options.ssh_private_key_path {
            builder = builder.key(key);
        }

        let endpoint = options.endpoint();
        let operator = Operator::new(builder)
            .map_err(|e| SyncError::connection(&endpoint, e))?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();

        Self::connect(operator, endpoint).await
    }

    #[cfg(not(unix))]
    pub async fn sftp(options: &SessionOptions) -> Result<Self> {
        Err(SyncError::connection(
            options.endpoint(),
            "当前平台不支持 SFTP",
        ))
    }

    /// operator 是惰性的，先做一次检查让连接/认证错误在打开时暴露
    async fn connect(operator: Operator, endpoint: String) -> Result<Self> {
        operator
            .check()
            .await
            .map_err(|e| SyncError::connection(&endpoint, e))?;
        Ok(Self {
            operator,
            name: endpoint,
        })
    }

    /// 文件路径：去掉开头的 `/`
    fn file_path(path: &str) -> String {
        path::segments(path).join("/")
    }

    /// 目录路径：以 `/` 结尾，根目录为 `/`
    fn dir_path(path: &str) -> String {
        let p = Self::file_path(path);
        if p.is_empty() {
            "/".to_string()
        } else {
            format!("{}/", p)
        }
    }
}

#[async_trait]
impl TransferSession for RemoteSession {
    async fn list_directory(&self, path: &str) -> Result<Option<Vec<RemoteFileRecord>>> {
        let dir = Self::dir_path(path);
        let mut lister = self
            .operator
            .lister_with(&dir)
            .metakey(Metakey::Mode | Metakey::ContentLength | Metakey::LastModified)
            .await
            .map_err(|e| SyncError::remote(path, e))?;

        let mut records = Vec::new();
        while let Some(entry) = lister
            .try_next()
            .await
            .map_err(|e| SyncError::remote(path, e))?
        {
            // 跳过目录自身
            if entry.path() == dir || entry.name().trim_end_matches('/').is_empty() {
                continue;
            }

            let meta = entry.metadata();
            let full_path = path::combine(path, entry.name().trim_end_matches('/'));
            let modified = meta.last_modified().unwrap_or_default();

            records.push(if meta.is_dir() {
                RemoteFileRecord::directory(full_path, modified)
            } else {
                RemoteFileRecord::file(full_path, modified, meta.content_length())
            });
        }

        Ok(Some(records))
    }

    async fn get_file(&self, remote_path: &str, local_path: &Path) -> Result<TransferResult> {
        let data = match self.operator.read(&Self::file_path(remote_path)).await {
            Ok(data) => data,
            Err(e) => return Ok(TransferResult::failed(e.to_string())),
        };
        tokio::fs::write(local_path, data.to_vec()).await?;
        Ok(TransferResult::success())
    }

    async fn put_file(
        &self,
        local_path: &Path,
        remote_path: &str,
        options: PutOptions,
    ) -> Result<TransferResult> {
        let target = Self::file_path(remote_path);

        if !options.overwrite && self.file_exists(remote_path).await? {
            return Ok(TransferResult::failed(format!("文件已存在: {}", remote_path)));
        }

        let data = tokio::fs::read(local_path).await?;
        if let Err(e) = self.operator.write(&target, data).await {
            return Ok(TransferResult::failed(e.to_string()));
        }

        if options.preserve_timestamp {
            debug!("远程存储不支持设置修改时间，跳过: {}", remote_path);
        }

        Ok(TransferResult::success())
    }

    async fn remove_file(&self, remote_path: &str) -> Result<()> {
        self.operator
            .delete(&Self::file_path(remote_path))
            .await
            .map_err(|e| SyncError::remote(remote_path, e))
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        let file = Self::file_path(path);
        if file.is_empty() {
            return Ok(true);
        }
        let dir = format!("{}/", file);

        for candidate in [file, dir] {
            match self.operator.stat(&candidate).await {
                Ok(_) => return Ok(true),
                Err(e) if e.kind() == opendal::ErrorKind::NotFound => continue,
                Err(e) => return Err(SyncError::remote(path, e)),
            }
        }
        Ok(false)
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        self.operator
            .create_dir(&Self::dir_path(path))
            .await
            .map_err(|e| SyncError::remote(path, e))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
