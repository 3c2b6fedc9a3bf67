//! 进度、错误上报与批处理策略

use crate::error::SyncError;
use crate::model::ChangeItem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// 扫描时在进入每个目录前调用，返回 false 时停止继续遍历
pub type ContinueProbe = Arc<dyn Fn() -> bool + Send + Sync>;

/// 由取消标志构造探针
pub fn cancel_probe(cancel_flag: Arc<AtomicBool>) -> ContinueProbe {
    Arc::new(move || !cancel_flag.load(Ordering::Relaxed))
}

/// 同步过程中的进度与错误上报
pub trait SyncStatus: Send + Sync {
    /// 面向用户的单项错误信息
    fn log_message(&self, message: &str);

    fn progress(&self, total: usize, current: usize);

    /// 每处理一项之前检查
    fn continue_processing(&self) -> bool {
        true
    }
}

/// 每项操作前后的回调，默认均为空操作
#[allow(unused_variables)]
pub trait SyncHooks: Send + Sync {
    fn before_add_item(&self, item: &ChangeItem, path: &str) {}
    fn after_add_item(&self, item: &ChangeItem, path: &str) {}
    fn before_update_item(&self, item: &ChangeItem, path: &str) {}
    fn after_update_item(&self, item: &ChangeItem, path: &str) {}
    fn before_delete_item(&self, item: &ChangeItem, path: &str) {}
    fn after_delete_item(&self, item: &ChangeItem, path: &str) {}
    fn error_item(&self, item: &ChangeItem, path: &str, error: &SyncError) {}
}

pub struct NoHooks;

impl SyncHooks for NoHooks {}

/// 单批次的错误策略，批次开始时确定，处理中不变
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchPolicy {
    /// 为 true 时任一项失败即中止整批
    pub fail_on_error: bool,
}

impl BatchPolicy {
    pub fn fail_fast() -> Self {
        Self {
            fail_on_error: true,
        }
    }

    pub fn continue_on_error() -> Self {
        Self {
            fail_on_error: false,
        }
    }
}

/// 通过 tracing 输出的上报实现，使用取消标志控制是否继续
#[derive(Debug, Clone, Default)]
pub struct TracingStatus {
    cancel_flag: Arc<AtomicBool>,
}

impl TracingStatus {
    pub fn new(cancel_flag: Arc<AtomicBool>) -> Self {
        Self { cancel_flag }
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }
}

impl SyncStatus for TracingStatus {
    fn log_message(&self, message: &str) {
        warn!("{}", message);
    }

    fn progress(&self, total: usize, current: usize) {
        info!("进度 {}/{}", current, total);
    }

    fn continue_processing(&self) -> bool {
        !self.cancel_flag.load(Ordering::SeqCst)
    }
}
