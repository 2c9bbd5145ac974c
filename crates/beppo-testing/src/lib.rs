//! Testing utilities and fixtures for beppo
//!
//! This crate provides temporary directories, content fixtures, object
//! stores with injected listing faults, and captured log output for testing
//! code built on beppo.

use anyhow::Result;
use std::future::Future;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod assertions;
pub mod fixtures;
pub mod logs;
pub mod stores;

pub use logs::CapturedLogs;
pub use stores::{FaultyStore, ListFault};

/// Creates a temporary test directory with cleanup on drop
#[derive(Debug)]
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// Creates a new temporary test directory
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Returns the path to the temporary directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the directory, without creating anything
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Creates a file with the given name and content in the test directory
    pub fn create_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

/// Run a future to completion on a throwaway current-thread runtime
///
/// Used to inspect object stores directly from synchronous tests.
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build test runtime")
        .block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_dir() {
        let test_dir = TestDir::new().unwrap();
        assert!(test_dir.path().exists());
    }

    #[test]
    fn test_create_file() {
        let test_dir = TestDir::new().unwrap();
        let file_path = test_dir.create_file("nested/test.txt", b"Hello, World!").unwrap();
        assert!(file_path.exists());
        assert_eq!(std::fs::read(&file_path).unwrap(), b"Hello, World!");
    }
}
