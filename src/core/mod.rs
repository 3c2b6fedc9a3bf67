pub mod filter;
pub mod materializer;
pub mod path;
pub mod reader;
pub mod scanner;
pub mod source;
pub mod staging;
pub mod status;
pub mod writer;

pub use filter::{parse_threshold, within_window, FileFilter};
pub use materializer::DirectoryMaterializer;
pub use reader::{ReaderConfig, RemoteReader};
pub use scanner::{FileScanner, ScanConfig, ScanResult};
pub use source::{BlobSource, DirectorySource};
pub use staging::StagingFile;
pub use status::{
    cancel_probe, BatchPolicy, ContinueProbe, NoHooks, SyncHooks, SyncStatus, TracingStatus,
};
pub use writer::{BatchReport, ChangeKind, Synchronizer, WriterConfig, DEFAULT_MAX_BLOB_SIZE_MB};
