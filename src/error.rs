//! 错误类型

use thiserror::Error;

/// 扫描与同步过程中的错误
#[derive(Debug, Error)]
pub enum SyncError {
    /// 会话打开或认证失败，整个操作中止
    #[error("连接失败 ({endpoint}): {message}")]
    Connection { endpoint: String, message: String },

    /// 远程列目录/创建目录/删除失败
    #[error("远程操作失败 ({path}): {message}")]
    Remote { path: String, message: String },

    /// 传输结果标记为失败
    #[error("传输文件失败 ({path}): {}", .failures.join("; "))]
    TransferFailed { path: String, failures: Vec<String> },

    /// 文件过大，无法暂存
    #[error("文件 ({path}) 过大，无法同步 ({size} 字节，上限 {limit} 字节)")]
    Oversize { path: String, size: u64, limit: u64 },

    /// 变更项缺少解析路径所需的数据
    #[error("无效的变更项: {0}")]
    InvalidItem(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    #[error("操作已取消")]
    Cancelled,

    /// 本地暂存文件 I/O
    #[error("本地 I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn remote(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SyncError::Remote {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn connection(endpoint: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SyncError::Connection {
            endpoint: endpoint.into(),
            message: err.to_string(),
        }
    }

    /// 是否属于整批必须中止的错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Connection { .. } | SyncError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_failed_message_joins_failures() {
        let err = SyncError::TransferFailed {
            path: "/data/x.csv".to_string(),
            failures: vec!["550 denied".to_string(), "closed".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "传输文件失败 (/data/x.csv): 550 denied; closed"
        );
    }

    #[test]
    fn test_oversize_is_distinct_from_transfer_failure() {
        let err = SyncError::Oversize {
            path: "/big.bin".to_string(),
            size: 10,
            limit: 5,
        };
        assert!(err.to_string().contains("过大"));
        assert!(!err.is_fatal());
        assert!(SyncError::connection("ftp://h", "refused").is_fatal());
    }
}
