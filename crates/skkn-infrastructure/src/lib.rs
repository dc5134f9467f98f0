pub mod app_state_store;
pub mod config_service;
pub mod file_snapshot_store;
pub mod key_pool;
pub mod markdown_exporter;
pub mod paths;
pub mod storage;
pub mod volatile_store;

pub use crate::app_state_store::AppStateStore;
pub use crate::config_service::ConfigService;
pub use crate::file_snapshot_store::FileSnapshotStore;
pub use crate::key_pool::RotatingKeyPool;
pub use crate::markdown_exporter::MarkdownExporter;
pub use crate::paths::SkknPaths;
pub use crate::volatile_store::TempDirVolatileStore;
