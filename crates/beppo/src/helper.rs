//! StorageHelper - blocking convenience operations over a storage client

use crate::client::StorageClient;
use crate::runtime::build_runtime;
use crate::{ObjectWriter, Result, StorageConfig, StorageError};
use futures_util::{future, TryStreamExt};
use http::Method;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, dispatcher, warn, Dispatch};

/// Blocking helper exposing download, upload, listing and URL signing
///
/// Every method blocks the calling thread until the backend answers and must
/// not be called from within an async runtime. The helper holds no mutable
/// state, so clones may be used from several threads at once.
#[derive(Debug, Clone)]
pub struct StorageHelper {
    client: Arc<dyn StorageClient>,
    config: StorageConfig,
    runtime: Arc<Runtime>,
    diagnostics: Option<Dispatch>,
}

/// Builder for [`StorageHelper`]
#[derive(Debug, Default)]
pub struct StorageHelperBuilder {
    client: Option<Arc<dyn StorageClient>>,
    config: StorageConfig,
    diagnostics: Option<Dispatch>,
}

impl StorageHelperBuilder {
    /// The storage capability the helper wraps
    pub fn client(mut self, client: Arc<dyn StorageClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(mut self, config: StorageConfig) -> Self {
        self.config = config;
        self
    }

    /// Route the helper's diagnostics to `dispatch` instead of the caller's default subscriber
    pub fn diagnostics(mut self, dispatch: Dispatch) -> Self {
        self.diagnostics = Some(dispatch);
        self
    }

    /// Build the helper
    ///
    /// # Errors
    /// Returns [`StorageError::MissingCapability`] when no client was given, after
    /// emitting a warning. Invalid configuration and runtime creation failures
    /// are reported as well.
    pub fn build(self) -> Result<StorageHelper> {
        let Some(client) = self.client else {
            let report = || warn!("StorageHelper requested without a storage client");
            match &self.diagnostics {
                Some(dispatch) => dispatcher::with_default(dispatch, report),
                None => report(),
            }
            return Err(StorageError::MissingCapability);
        };

        self.config.validate()?;
        let runtime = build_runtime(self.config.worker_threads)?;

        Ok(StorageHelper {
            client,
            config: self.config,
            runtime: Arc::new(runtime),
            diagnostics: self.diagnostics,
        })
    }
}

impl StorageHelper {
    /// Wrap `client` with the default configuration
    ///
    /// # Errors
    /// Returns [`StorageError::MissingCapability`] when `client` is `None`.
    pub fn new(client: Option<Arc<dyn StorageClient>>) -> Result<Self> {
        let builder = Self::builder();
        match client {
            Some(client) => builder.client(client).build(),
            None => builder.build(),
        }
    }

    pub fn builder() -> StorageHelperBuilder {
        StorageHelperBuilder::default()
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.diagnostics {
            Some(dispatch) => dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }

    /// Copy `bucket/object` into the local file at `destination`
    ///
    /// The whole object is read into memory before it is written out. The
    /// destination is created or truncated first and is left in place if a
    /// later step fails.
    pub fn download(&self, bucket: &str, object: &str, destination: impl AsRef<Path>) -> Result<()> {
        self.in_scope(|| self.download_object(bucket, object, destination.as_ref()))
    }

    fn download_object(&self, bucket: &str, object: &str, destination: &Path) -> Result<()> {
        debug!(bucket, object, destination = %destination.display(), "Downloading object");
        let location = object_path(bucket, object)?;
        let mut file = File::create(destination).map_err(|source| StorageError::CreateFile {
            path: destination.to_path_buf(),
            source,
        })?;

        let handle = self.client.bucket(bucket)?;
        let data = self.runtime.block_on(async {
            let result = handle
                .store
                .get(&location)
                .await
                .map_err(|source| StorageError::OpenObject {
                    bucket: bucket.to_string(),
                    object: object.to_string(),
                    source,
                })?;
            let data = result.bytes().await.map_err(|source| StorageError::ReadObject {
                bucket: bucket.to_string(),
                object: object.to_string(),
                source,
            })?;
            Ok::<_, StorageError>(data)
        })?;

        file.write_all(&data)
            .map_err(|source| StorageError::WriteFile {
                path: destination.to_path_buf(),
                source,
            })?;
        file.sync_all().map_err(|source| StorageError::CloseFile {
            path: destination.to_path_buf(),
            source,
        })?;

        debug!(bucket, object, size = data.len(), "Download complete");
        Ok(())
    }

    /// Store `text` as `bucket/object` with a plain-text content type
    pub fn upload_text(&self, bucket: &str, object: &str, text: &str) -> Result<()> {
        self.in_scope(|| -> Result<()> {
            debug!(bucket, object, size = text.len(), "Uploading text");
            let mut writer = self
                .writer(bucket, object)?
                .with_content_type(self.config.text_content_type.as_str());
            writer
                .write_all(text.as_bytes())
                .map_err(|source| StorageError::Transfer {
                    bucket: bucket.to_string(),
                    object: object.to_string(),
                    source,
                })?;
            self.finish(writer, bucket, object)
        })
    }

    /// Stream the local file at `source` into `bucket/object`
    pub fn upload_file(&self, bucket: &str, source: impl AsRef<Path>, object: &str) -> Result<()> {
        let source = source.as_ref();
        self.in_scope(|| -> Result<()> {
            debug!(bucket, object, source = %source.display(), "Uploading file");
            let mut writer = self.writer(bucket, object)?;
            let mut file = File::open(source).map_err(|e| StorageError::OpenFile {
                path: source.to_path_buf(),
                source: e,
            })?;

            let copied = std::io::copy(&mut file, &mut writer).map_err(|e| {
                StorageError::Transfer {
                    bucket: bucket.to_string(),
                    object: object.to_string(),
                    source: e,
                }
            })?;
            drop(file);

            debug!(bucket, object, size = copied, parts = writer.parts_uploaded(), "File streamed");
            self.finish(writer, bucket, object)
        })
    }

    fn writer(&self, bucket: &str, object: &str) -> Result<ObjectWriter> {
        let location = object_path(bucket, object)?;
        let handle = self.client.bucket(bucket)?;
        Ok(ObjectWriter::new(
            handle.store,
            self.runtime.clone(),
            location,
            &self.config,
        ))
    }

    fn finish(&self, writer: ObjectWriter, bucket: &str, object: &str) -> Result<()> {
        writer
            .finish()
            .map_err(|source| StorageError::FinalizeObject {
                bucket: bucket.to_string(),
                object: object.to_string(),
                source,
            })
    }

    /// Keys in `bucket` starting with `prefix`, in backend order
    ///
    /// The whole enumeration must finish within the configured list timeout
    /// (10 seconds by default). Partial results are never returned.
    ///
    /// Enumeration starts right after `prefix` and stops at the first key
    /// sorting past it, which relies on the lexicographic listing order of
    /// GCS, S3 and the in-memory store.
    pub fn list_objects_with_prefix(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        self.in_scope(|| -> Result<Vec<String>> {
            let handle = self.client.bucket(bucket)?;
            let timeout = self.config.list_timeout();
            let Some(scope) = ListingScope::for_prefix(prefix) else {
                debug!(bucket, prefix, "No storable key can start with prefix");
                return Ok(Vec::new());
            };
            debug!(bucket, prefix, ?timeout, "Listing objects");

            let keys = self
                .runtime
                .block_on(async {
                    let listing = async {
                        let mut keys = Vec::new();
                        let entries = match &scope.offset {
                            Some(offset) => {
                                // list_with_offset starts strictly after the offset
                                match handle.store.head(offset).await {
                                    Ok(meta) => keys.push(String::from(meta.location)),
                                    Err(object_store::Error::NotFound { .. }) => {}
                                    Err(e) => return Err(e),
                                }
                                handle.store.list_with_offset(scope.root.as_ref(), offset)
                            }
                            None => handle.store.list(scope.root.as_ref()),
                        };
                        let matching: Vec<String> = entries
                            .try_take_while(|meta| {
                                let key = meta.location.as_ref();
                                future::ready(Ok(key < prefix || key.starts_with(prefix)))
                            })
                            .try_filter(|meta| {
                                future::ready(meta.location.as_ref().starts_with(prefix))
                            })
                            .map_ok(|meta| String::from(meta.location))
                            .try_collect()
                            .await?;
                        keys.extend(matching);
                        Ok::<_, object_store::Error>(keys)
                    };
                    tokio::time::timeout(timeout, listing).await
                })
                .map_err(|_| StorageError::Timeout {
                    bucket: bucket.to_string(),
                    timeout,
                })?
                .map_err(|source| StorageError::ListObjects {
                    bucket: bucket.to_string(),
                    source,
                })?;

            debug!(bucket, prefix, count = keys.len(), "Listing complete");
            Ok(keys)
        })
    }

    /// A signed URL granting GET access to `bucket/object` for `expiration_minutes`
    ///
    /// The expiry is not bounded here; zero yields a URL that is already
    /// expired, and the backend may reject values above its own maximum.
    pub fn generate_signed_url(
        &self,
        bucket: &str,
        object: &str,
        expiration_minutes: u64,
    ) -> Result<String> {
        self.in_scope(|| -> Result<String> {
            let location = object_path(bucket, object)?;
            let handle = self.client.bucket(bucket)?;
            let signer = handle
                .signer
                .ok_or_else(|| StorageError::SigningUnavailable {
                    bucket: bucket.to_string(),
                })?;

            let expires_in = Duration::from_secs(expiration_minutes.saturating_mul(60));
            debug!(bucket, object, ?expires_in, "Signing URL");
            let url = self
                .runtime
                .block_on(signer.signed_url(Method::GET, &location, expires_in))
                .map_err(|source| StorageError::Signing {
                    bucket: bucket.to_string(),
                    source,
                })?;
            Ok(url.to_string())
        })
    }
}

/// Storage path for `object`, refusing keys the backend would store under another name
fn object_path(bucket: &str, object: &str) -> Result<ObjectPath> {
    let invalid = |reason: String| StorageError::InvalidKey {
        bucket: bucket.to_string(),
        object: object.to_string(),
        reason,
    };
    if object.is_empty() {
        return Err(invalid("key is empty".to_string()));
    }
    let path = ObjectPath::parse(object).map_err(|e| invalid(e.to_string()))?;
    if path.as_ref() != object {
        return Err(invalid("leading or trailing '/' is not kept".to_string()));
    }
    Ok(path)
}

/// Where to enumerate for a string prefix
///
/// Object stores list whole path segments, so `logs/2024-` is listed under
/// `logs`, starting after the key `logs/2024-`.
#[derive(Debug, PartialEq)]
struct ListingScope {
    root: Option<ObjectPath>,
    offset: Option<ObjectPath>,
}

impl ListingScope {
    /// `None` when no storable key can start with `prefix`
    fn for_prefix(prefix: &str) -> Option<Self> {
        let (dir, rest) = match prefix.rfind('/') {
            Some(i) => (&prefix[..i], &prefix[i + 1..]),
            None => ("", prefix),
        };

        let root = if dir.is_empty() {
            if prefix.starts_with('/') {
                return None;
            }
            None
        } else {
            let path = ObjectPath::parse(dir).ok()?;
            if path.as_ref() != dir {
                return None;
            }
            Some(path)
        };

        // A trailing "." segment is not a valid path yet may begin a valid key
        let offset = if rest.is_empty() {
            None
        } else {
            ObjectPath::parse(prefix)
                .ok()
                .filter(|path| path.as_ref() == prefix)
        };

        Some(Self { root, offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryClient;

    fn scope(root: Option<&str>, offset: Option<&str>) -> Option<ListingScope> {
        Some(ListingScope {
            root: root.map(ObjectPath::from),
            offset: offset.map(ObjectPath::from),
        })
    }

    #[test]
    fn test_listing_scope() {
        assert_eq!(ListingScope::for_prefix(""), scope(None, None));
        assert_eq!(ListingScope::for_prefix("logs"), scope(None, Some("logs")));
        assert_eq!(ListingScope::for_prefix("logs/"), scope(Some("logs"), None));
        assert_eq!(
            ListingScope::for_prefix("logs/2024/jan-"),
            scope(Some("logs/2024"), Some("logs/2024/jan-"))
        );
        assert_eq!(ListingScope::for_prefix("x/."), scope(Some("x"), None));
    }

    #[test]
    fn test_listing_scope_for_unstorable_prefixes() {
        assert_eq!(ListingScope::for_prefix("/logs"), None);
        assert_eq!(ListingScope::for_prefix("dir//"), None);
        assert_eq!(ListingScope::for_prefix("x/./y"), None);
    }

    #[test]
    fn test_object_path_keeps_keys_verbatim() {
        for key in ["50%off.txt", "a#b.txt", "logs/2024-01-01.txt", "x/.hidden"] {
            assert_eq!(object_path("b", key).unwrap().as_ref(), key);
        }
        for key in ["", "/lead.txt", "dir//x.txt", "x/./y.txt", "trailing/"] {
            assert!(matches!(
                object_path("b", key),
                Err(StorageError::InvalidKey { ref object, .. }) if object == key
            ));
        }
    }

    #[test]
    fn test_missing_client_is_an_error() {
        let err = StorageHelper::new(None).unwrap_err();
        assert!(matches!(err, StorageError::MissingCapability));
    }

    #[test]
    fn test_builder_applies_config() {
        let config = StorageConfig {
            list_timeout_secs: 2,
            ..Default::default()
        };
        let helper = StorageHelper::builder()
            .client(Arc::new(MemoryClient::new()))
            .config(config.clone())
            .build()
            .unwrap();
        assert_eq!(helper.config(), &config);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let err = StorageHelper::builder()
            .client(Arc::new(MemoryClient::new()))
            .config(StorageConfig {
                write_buffer_size: 0,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }
}
