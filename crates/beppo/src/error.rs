//! Error types for beppo

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`StorageHelper`](crate::StorageHelper) and its collaborators
#[derive(Error, Debug)]
pub enum StorageError {
    /// The helper was built without a storage client
    #[error("Storage client capability is missing")]
    MissingCapability,

    /// The local destination file could not be created
    #[error("Failed to create local file {}: {source}", path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The local source file could not be opened
    #[error("Failed to open local file {}: {source}", path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing downloaded bytes to the local file failed
    #[error("Failed to write local file {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Flushing and closing the local file failed
    #[error("Failed to close local file {}: {source}", path.display())]
    CloseFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The storage client could not provide a handle for the bucket
    #[error("Failed to connect to bucket {bucket:?}: {source}")]
    Connect {
        bucket: String,
        #[source]
        source: object_store::Error,
    },

    /// The key cannot be stored unchanged by the backend
    #[error("Object key {object:?} is not representable in bucket {bucket:?}: {reason}")]
    InvalidKey {
        bucket: String,
        object: String,
        reason: String,
    },

    /// The remote object could not be opened for reading
    #[error("Failed to open object {bucket}/{object}: {source}")]
    OpenObject {
        bucket: String,
        object: String,
        #[source]
        source: object_store::Error,
    },

    /// Reading the remote object failed mid-transfer
    #[error("Failed to read object {bucket}/{object}: {source}")]
    ReadObject {
        bucket: String,
        object: String,
        #[source]
        source: object_store::Error,
    },

    /// Streaming bytes into the remote object failed
    #[error("Failed to write object {bucket}/{object}: {source}")]
    Transfer {
        bucket: String,
        object: String,
        #[source]
        source: std::io::Error,
    },

    /// Committing the remote object failed; it may be absent or incomplete
    #[error("Failed to finalize object {bucket}/{object}: {source}")]
    FinalizeObject {
        bucket: String,
        object: String,
        #[source]
        source: object_store::Error,
    },

    /// Enumerating the bucket failed; partial results are discarded
    #[error("Failed to list objects in bucket {bucket:?}: {source}")]
    ListObjects {
        bucket: String,
        #[source]
        source: object_store::Error,
    },

    /// Enumerating the bucket did not finish before the deadline
    #[error("Listing bucket {bucket:?} timed out after {timeout:?}")]
    Timeout { bucket: String, timeout: Duration },

    /// The storage client holds no signing credentials for the bucket
    #[error("Bucket {bucket:?} has no URL signing credentials")]
    SigningUnavailable { bucket: String },

    /// The backend refused to sign the URL
    #[error("Failed to sign URL for bucket {bucket:?}: {source}")]
    Signing {
        bucket: String,
        #[source]
        source: object_store::Error,
    },

    /// The Tokio runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Whether this error comes from the local filesystem rather than the backend
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            StorageError::CreateFile { .. }
                | StorageError::OpenFile { .. }
                | StorageError::WriteFile { .. }
                | StorageError::CloseFile { .. }
        )
    }

    /// Whether the backend reported that the object or bucket does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::OpenObject { source, .. } | StorageError::ReadObject { source, .. } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

impl From<StorageError> for std::io::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::CreateFile { source, .. }
            | StorageError::OpenFile { source, .. }
            | StorageError::WriteFile { source, .. }
            | StorageError::CloseFile { source, .. }
            | StorageError::Transfer { source, .. } => source,
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}
