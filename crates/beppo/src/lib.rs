//! # beppo
//!
//! Helper layer over cloud object storage. A [`StorageHelper`] wraps an
//! already authenticated [`StorageClient`] and exposes short blocking calls:
//!
//! - [`StorageHelper::download`]: copy an object into a local file
//! - [`StorageHelper::upload_text`]: store a string as a `text/plain` object
//! - [`StorageHelper::upload_file`]: stream a local file into an object
//! - [`StorageHelper::list_objects_with_prefix`]: keys sharing a prefix
//! - [`StorageHelper::generate_signed_url`]: time-limited GET URL
//!
//! ## Architecture
//!
//! The helper drives the async `object_store` API from an internal Tokio
//! runtime, so callers stay synchronous. Uploads go through [`ObjectWriter`],
//! a `std::io::Write` adapter that switches to multipart uploads for large
//! objects. Nothing is retried or cached.
//!
//! ```no_run
//! use beppo::{CloudClient, StorageClient, StorageHelper};
//! use std::sync::Arc;
//!
//! let client: Arc<dyn StorageClient> = Arc::new(CloudClient::gcs_from_env());
//! let helper = StorageHelper::new(Some(client))?;
//! helper.upload_text("my-bucket", "greeting.txt", "hello world")?;
//! let url = helper.generate_signed_url("my-bucket", "greeting.txt", 15)?;
//! # Ok::<(), beppo::StorageError>(())
//! ```

#![warn(missing_debug_implementations)]

mod buffer;
mod client;
mod config;
mod error;
mod helper;
mod runtime;
mod writer;

pub use client::{BucketHandle, CloudClient, MemoryClient, StorageClient};
pub use config::StorageConfig;
pub use error::{Result, StorageError};
pub use helper::{StorageHelper, StorageHelperBuilder};
pub use writer::ObjectWriter;

// Re-export commonly used types from object_store
pub use object_store::{path::Path as ObjectPath, DynObjectStore, ObjectStore};
