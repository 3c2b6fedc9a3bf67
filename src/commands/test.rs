use crate::config::JobConfig;
use crate::session::{close_session, open_session};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TestConnectionResult {
    pub success: bool,
    pub message: String,
    pub details: Option<String>,
}

/// 打开会话并列出根目录
pub async fn test_connection(config: &JobConfig) -> TestConnectionResult {
    let options = config.session_options();
    let session = match open_session(&options).await {
        Ok(session) => session,
        Err(e) => {
            return TestConnectionResult {
                success: false,
                message: "连接失败".to_string(),
                details: Some(e.to_string()),
            }
        }
    };

    let listing = session.list_directory(&config.path).await;
    close_session(session).await;

    match listing {
        Ok(entries) => TestConnectionResult {
            success: true,
            message: "连接成功".to_string(),
            details: Some(format!(
                "{} 下有 {} 个条目",
                config.path,
                entries.map(|e| e.len()).unwrap_or(0)
            )),
        },
        Err(e) => TestConnectionResult {
            success: false,
            message: "无法列出根目录".to_string(),
            details: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Protocol;

    #[tokio::test]
    async fn test_local_connection() {
        let server = tempfile::tempdir().unwrap();
        std::fs::write(server.path().join("a.txt"), b"x").unwrap();

        let config = JobConfig {
            protocol: Protocol::Local,
            host_name: server.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        let result = test_connection(&config).await;
        assert!(result.success);
        assert_eq!(result.details.as_deref(), Some("/ 下有 1 个条目"));

        let config = JobConfig {
            protocol: Protocol::Local,
            host_name: "/definitely/not/here".to_string(),
            ..Default::default()
        };
        assert!(!test_connection(&config).await.success);
    }
}
