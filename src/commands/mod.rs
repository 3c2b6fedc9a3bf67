//! 命令行子命令

pub mod apply;
pub mod fetch;
pub mod scan;
pub mod test;

use crate::config::JobConfig;
use anyhow::Result;
use std::path::Path;
use tracing::debug;

/// 加载任务配置，日志中不输出凭据
pub fn load_job(path: &Path) -> Result<JobConfig> {
    let config = JobConfig::load(path)?;
    debug!(
        "已加载配置: {:?} -> {}{}",
        path,
        config.session_options().endpoint(),
        config.path
    );
    Ok(config)
}
