pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod model;
pub mod session;

pub use crate::config::JobConfig;
pub use crate::core::{
    BatchPolicy, BatchReport, BlobSource, FileScanner, RemoteReader, ScanConfig, SyncHooks,
    SyncStatus, Synchronizer,
};
pub use crate::error::{Result, SyncError};
pub use crate::model::{ChangeItem, ChangeSet, DataTable, NormalizedRow, RemoteFileRecord};
pub use crate::session::{SessionFactory, SessionOptions, TransferSession};
