//! Object stores with injected listing faults

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use futures_util::future;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    DynObjectStore, GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore,
    PutMultipartOpts, PutOptions, PutPayload, PutResult, Result,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How listings misbehave
#[derive(Debug, Clone, Copy)]
pub enum ListFault {
    /// Hold the listing back for the given duration before yielding anything
    Stall(Duration),
    /// Yield this many entries, then fail
    FailAfter(usize),
}

/// Delegates everything to an inner store except listings, which misbehave
#[derive(Debug)]
pub struct FaultyStore {
    inner: Arc<DynObjectStore>,
    fault: ListFault,
}

impl FaultyStore {
    pub fn new(inner: Arc<DynObjectStore>, fault: ListFault) -> Self {
        Self { inner, fault }
    }

    /// An empty in-memory store with the given fault
    pub fn in_memory(fault: ListFault) -> Self {
        Self::new(Arc::new(InMemory::new()), fault)
    }
}

impl fmt::Display for FaultyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FaultyStore({})", self.inner)
    }
}

fn injected_failure() -> object_store::Error {
    object_store::Error::Generic {
        store: "FaultyStore",
        source: "injected listing failure".into(),
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> Result<PutResult> {
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOpts,
    ) -> Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(&self, location: &Path, options: GetOptions) -> Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, Result<ObjectMeta>> {
        self.misbehave(self.inner.list(prefix))
    }

    fn list_with_offset(
        &self,
        prefix: Option<&Path>,
        offset: &Path,
    ) -> BoxStream<'_, Result<ObjectMeta>> {
        self.misbehave(self.inner.list_with_offset(prefix, offset))
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

impl FaultyStore {
    fn misbehave<'a>(
        &self,
        entries: BoxStream<'a, Result<ObjectMeta>>,
    ) -> BoxStream<'a, Result<ObjectMeta>> {
        match self.fault {
            ListFault::Stall(delay) => stream::once(async move { tokio::time::sleep(delay).await })
                .filter_map(|_| future::ready(None))
                .chain(entries)
                .boxed(),
            ListFault::FailAfter(count) => entries
                .take(count)
                .chain(stream::once(future::ready(Err(injected_failure()))))
                .boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::seed_listing_keys;
    use futures_util::TryStreamExt;

    #[test]
    fn test_fail_after_yields_prefix_then_error() {
        let store = FaultyStore::in_memory(ListFault::FailAfter(2));
        seed_listing_keys(&store).unwrap();

        let items: Vec<Result<ObjectMeta>> = crate::block_on(store.list(None).collect());
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok() && items[1].is_ok());
        assert!(items[2].is_err());
    }

    #[test]
    fn test_stall_eventually_yields_everything() {
        let store = FaultyStore::in_memory(ListFault::Stall(Duration::from_millis(10)));
        seed_listing_keys(&store).unwrap();

        let items: Vec<ObjectMeta> = crate::block_on(store.list(None).try_collect()).unwrap();
        assert_eq!(items.len(), crate::fixtures::listing_keys().len());
    }

    #[test]
    fn test_offset_listing_carries_the_fault() {
        let store = FaultyStore::in_memory(ListFault::FailAfter(1));
        seed_listing_keys(&store).unwrap();

        let offset = Path::from("media");
        let items: Vec<Result<ObjectMeta>> =
            crate::block_on(store.list_with_offset(None, &offset).collect());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().location, Path::from("media/cat.png"));
        assert!(items[1].is_err());
    }
}
