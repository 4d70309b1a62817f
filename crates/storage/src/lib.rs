#![forbid(unsafe_code)]

pub mod repository;
pub mod snapshot;
pub mod sqlite;

pub use repository::{InMemorySnapshotRepository, SnapshotRepository, Storage, StorageError};
pub use snapshot::{PROGRESS_SNAPSHOT_KEY, ProgressSnapshot};
