//! Storage client capabilities
//!
//! A [`StorageClient`] is the pre-authenticated handle a [`StorageHelper`](crate::StorageHelper)
//! is built from. It resolves bucket names to object stores and, where the
//! credentials allow it, to URL signers.

use crate::{Result, StorageError};
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::memory::InMemory;
use object_store::signer::Signer;
use object_store::DynObjectStore;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Access to a single bucket
#[derive(Debug, Clone)]
pub struct BucketHandle {
    /// Object store scoped to the bucket
    pub store: Arc<DynObjectStore>,
    /// URL signer, if the client holds signing credentials
    pub signer: Option<Arc<dyn Signer>>,
}

impl BucketHandle {
    /// A handle without signing support
    pub fn unsigned(store: Arc<DynObjectStore>) -> Self {
        Self {
            store,
            signer: None,
        }
    }
}

/// An opaque, already authenticated capability to a storage service
pub trait StorageClient: Send + Sync + fmt::Debug {
    /// Resolve the handle for `bucket`
    fn bucket(&self, bucket: &str) -> Result<BucketHandle>;
}

/// In-process buckets, created empty on first use
///
/// Arbitrary stores can be registered for a bucket name, which is how tests
/// put slow or failing backends behind a helper.
#[derive(Debug, Default)]
pub struct MemoryClient {
    buckets: Mutex<HashMap<String, Arc<DynObjectStore>>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` as the backend of `bucket`
    pub fn with_bucket(self, bucket: impl Into<String>, store: Arc<DynObjectStore>) -> Self {
        self.insert_bucket(bucket, store);
        self
    }

    pub fn insert_bucket(&self, bucket: impl Into<String>, store: Arc<DynObjectStore>) {
        self.buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(bucket.into(), store);
    }

    /// The store backing `bucket`, creating an empty one if needed
    pub fn store(&self, bucket: &str) -> Arc<DynObjectStore> {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        buckets
            .entry(bucket.to_string())
            .or_insert_with(|| {
                debug!(bucket, "Creating in-memory bucket");
                Arc::new(InMemory::new())
            })
            .clone()
    }
}

impl StorageClient for MemoryClient {
    fn bucket(&self, bucket: &str) -> Result<BucketHandle> {
        Ok(BucketHandle::unsigned(self.store(bucket)))
    }
}

#[derive(Debug, Clone)]
enum Provider {
    Gcs(GoogleCloudStorageBuilder),
    S3(AmazonS3Builder),
}

/// A cloud provider client that builds one store per bucket from a template builder
///
/// Built stores are kept for the lifetime of the client so repeated calls
/// against a bucket share one HTTP client.
#[derive(Debug)]
pub struct CloudClient {
    provider: Provider,
    handles: Mutex<HashMap<String, BucketHandle>>,
}

impl CloudClient {
    fn with_provider(provider: Provider) -> Self {
        Self {
            provider,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Google Cloud Storage, configured by `builder` (the bucket name is filled per call)
    pub fn gcs(builder: GoogleCloudStorageBuilder) -> Self {
        Self::with_provider(Provider::Gcs(builder))
    }

    /// Google Cloud Storage using credentials from the environment
    pub fn gcs_from_env() -> Self {
        Self::gcs(GoogleCloudStorageBuilder::from_env())
    }

    /// Amazon S3 or a compatible service, configured by `builder`
    pub fn s3(builder: AmazonS3Builder) -> Self {
        Self::with_provider(Provider::S3(builder))
    }

    /// Amazon S3 using credentials from the environment
    pub fn s3_from_env() -> Self {
        Self::s3(AmazonS3Builder::from_env())
    }

    /// Pick the provider from a URL scheme (`gs` or `s3`), configured from the environment
    pub fn from_scheme(scheme: &str) -> Result<Self> {
        match scheme {
            "gs" => Ok(Self::gcs_from_env()),
            "s3" => Ok(Self::s3_from_env()),
            other => Err(StorageError::Config(format!(
                "Unsupported scheme: {}. Use gs:// or s3://",
                other
            ))),
        }
    }

    /// Human-readable provider name
    pub fn provider_name(&self) -> &'static str {
        match self.provider {
            Provider::Gcs(_) => "Google Cloud Storage",
            Provider::S3(_) => "Amazon S3",
        }
    }

    fn build(&self, bucket: &str) -> object_store::Result<BucketHandle> {
        match &self.provider {
            Provider::Gcs(builder) => {
                let store = Arc::new(builder.clone().with_bucket_name(bucket).build()?);
                Ok(BucketHandle {
                    store: store.clone(),
                    signer: Some(store),
                })
            }
            Provider::S3(builder) => {
                let store = Arc::new(builder.clone().with_bucket_name(bucket).build()?);
                Ok(BucketHandle {
                    store: store.clone(),
                    signer: Some(store),
                })
            }
        }
    }
}

impl StorageClient for CloudClient {
    fn bucket(&self, bucket: &str) -> Result<BucketHandle> {
        let mut handles = self
            .handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = handles.get(bucket) {
            return Ok(handle.clone());
        }

        debug!(bucket, provider = self.provider_name(), "Building bucket store");
        let handle = self.build(bucket).map_err(|source| StorageError::Connect {
            bucket: bucket.to_string(),
            source,
        })?;
        handles.insert(bucket.to_string(), handle.clone());
        Ok(handle)
    }
}
