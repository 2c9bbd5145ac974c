//! ObjectWriter - provides a synchronous Write trait for cloud objects

use crate::{buffer::WriteBuffer, StorageConfig};
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, DynObjectStore, MultipartUpload, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload,
};
use std::io::Write;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, trace, warn};

/// A writer that uploads everything written to it as a single object
///
/// Data is buffered in chunks of `write_buffer_size`. Small objects are sent
/// with one PUT from [`finish`](ObjectWriter::finish); once more than
/// `multipart_threshold` bytes have been written the writer switches to a
/// multipart upload and ships every full buffer as a part.
///
/// Memory use is bounded by `multipart_threshold + write_buffer_size` while
/// multipart upload is enabled; without it the whole object is held until
/// `finish`.
///
/// Nothing is committed until `finish` succeeds. Dropping an unfinished
/// writer discards buffered data and aborts any multipart upload.
pub struct ObjectWriter {
    store: Arc<DynObjectStore>,
    runtime: Arc<Runtime>,
    path: ObjectPath,
    buffer: WriteBuffer,
    /// Full buffers held back until the multipart threshold is crossed
    staged: Vec<Bytes>,
    attributes: Attributes,
    use_multipart_upload: bool,
    multipart_threshold: u64,
    bytes_written: u64,
    parts_uploaded: usize,
    multipart: Option<Box<dyn MultipartUpload>>,
    finished: bool,
}

impl std::fmt::Debug for ObjectWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectWriter")
            .field("path", &self.path)
            .field("bytes_written", &self.bytes_written)
            .field("parts_uploaded", &self.parts_uploaded)
            .field("multipart", &self.multipart.is_some())
            .finish()
    }
}

impl ObjectWriter {
    /// Create a new ObjectWriter
    ///
    /// # Arguments
    /// * `store` - The object store to write to
    /// * `runtime` - Runtime used to drive uploads from blocking calls
    /// * `path` - Path to the object
    /// * `config` - Buffer and multipart settings
    pub fn new(
        store: Arc<DynObjectStore>,
        runtime: Arc<Runtime>,
        path: ObjectPath,
        config: &StorageConfig,
    ) -> Self {
        Self {
            store,
            runtime,
            path,
            buffer: WriteBuffer::new(config.write_buffer_size),
            staged: Vec::new(),
            attributes: Attributes::new(),
            use_multipart_upload: config.use_multipart_upload,
            multipart_threshold: config.multipart_threshold as u64,
            bytes_written: 0,
            parts_uploaded: 0,
            multipart: None,
            finished: false,
        }
    }

    /// Declare the content type stored with the object
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type: String = content_type.into();
        self.attributes
            .insert(Attribute::ContentType, content_type.into());
        self
    }

    /// Get the total number of bytes written
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Number of multipart parts shipped so far
    pub fn parts_uploaded(&self) -> usize {
        self.parts_uploaded
    }

    /// Ship the current buffer, starting a multipart upload once past the threshold
    fn ship_buffer(&mut self) -> object_store::Result<()> {
        let chunk = self.buffer.take();
        if chunk.is_empty() {
            return Ok(());
        }

        if self.multipart.is_some() {
            return self.put_part(chunk);
        }

        self.staged.push(chunk);
        if !self.use_multipart_upload || self.bytes_written <= self.multipart_threshold {
            return Ok(());
        }

        debug!(path = %self.path, "Starting multipart upload");
        let opts = PutMultipartOpts {
            attributes: self.attributes.clone(),
            ..Default::default()
        };
        let upload = self
            .runtime
            .block_on(self.store.put_multipart_opts(&self.path, opts))?;
        self.multipart = Some(upload);

        for chunk in std::mem::take(&mut self.staged) {
            self.put_part(chunk)?;
        }
        Ok(())
    }

    fn put_part(&mut self, chunk: Bytes) -> object_store::Result<()> {
        let Some(upload) = self.multipart.as_mut() else {
            return Ok(());
        };
        trace!(path = %self.path, size = chunk.len(), "Uploading part");
        self.runtime.block_on(upload.put_part(PutPayload::from(chunk)))?;
        self.parts_uploaded += 1;
        Ok(())
    }

    fn finish_upload(&mut self) -> object_store::Result<()> {
        if self.multipart.is_some() {
            self.ship_buffer()?;
            let Some(mut upload) = self.multipart.take() else {
                return Ok(());
            };
            debug!(path = %self.path, parts = self.parts_uploaded, "Completing multipart upload");
            if let Err(e) = self.runtime.block_on(upload.complete()) {
                let _ = self.runtime.block_on(upload.abort());
                return Err(e);
            }
            return Ok(());
        }

        let mut chunks = std::mem::take(&mut self.staged);
        chunks.push(self.buffer.take());
        let payload: PutPayload = chunks.into_iter().collect();
        debug!(path = %self.path, size = payload.content_length(), "Uploading object");
        let opts = PutOptions {
            attributes: self.attributes.clone(),
            ..Default::default()
        };
        self.runtime
            .block_on(self.store.put_opts(&self.path, payload, opts))?;
        Ok(())
    }

    /// Commit the object
    ///
    /// The object does not exist remotely until this returns `Ok`.
    pub fn finish(mut self) -> object_store::Result<()> {
        let result = self.finish_upload();
        self.finished = result.is_ok();
        result
    }
}

impl Write for ObjectWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut remaining = buf;
        while !remaining.is_empty() {
            let n = self.buffer.write(remaining);
            self.bytes_written += n as u64;
            remaining = &remaining[n..];

            if self.buffer.remaining() == 0 {
                trace!(path = %self.path, size = self.buffer.len(), "Buffer full");
                self.ship_buffer()
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        // Parts are shipped when the buffer fills; the object is committed by finish
        Ok(())
    }
}

impl Drop for ObjectWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(mut upload) = self.multipart.take() {
            warn!(path = %self.path, "Aborting unfinished multipart upload");
            if let Err(e) = self.runtime.block_on(upload.abort()) {
                warn!(path = %self.path, error = %e, "Failed to abort multipart upload");
            }
        } else if !self.buffer.is_empty() || !self.staged.is_empty() {
            debug!(path = %self.path, "Discarding unfinished upload");
        }
    }
}
