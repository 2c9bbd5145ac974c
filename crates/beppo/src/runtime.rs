//! Tokio runtime management for blocking operations

use crate::{Result, StorageError};
use tokio::runtime::Runtime;

/// Build the runtime a helper uses to drive the async object store API.
pub(crate) fn build_runtime(worker_threads: usize) -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .thread_name("beppo-worker")
        .build()
        .map_err(|e| StorageError::Runtime(format!("Failed to create Tokio runtime: {}", e)))
}
