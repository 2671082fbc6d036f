//! Blob store abstraction.
//!
//! File bytes are addressed by opaque keys (the file record id). Backends
//! implement single-shot puts, presigned time-limited downloads, deletes,
//! and the three-call multipart protocol: create a session, upload parts
//! that each return an opaque tag, then complete with an ordered
//! (part number, tag) list — or abort. No business logic lives here;
//! quota and metadata decisions belong to the services layer.

mod local;
mod s3;

pub use local::LocalBlobStore;
pub use s3::S3BlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("multipart session `{0}` not found")]
    SessionNotFound(String),
    #[error("tag mismatch for part {0}")]
    TagMismatch(i32),
    #[error("backend error: {0}")]
    Backend(String),
}

pub type BlobResult<T> = Result<T, BlobError>;

/// One entry of the ordered part list passed to multipart completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTag {
    /// 1-based part number.
    pub part_number: i32,
    /// Opaque tag the backend returned for this part.
    pub tag: String,
}

/// Abstraction over object storage backends.
///
/// Keys are UUIDs; the raw blobs are meaningless without the metadata DB.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a complete object in one shot.
    async fn put_object(&self, key: &str, data: Bytes) -> BlobResult<()>;

    /// Produce a time-limited download URL for an existing object. The
    /// backend is asked to serve it under `response_filename`.
    async fn presigned_get_url(
        &self,
        key: &str,
        response_filename: &str,
        ttl: Duration,
    ) -> BlobResult<String>;

    /// Delete one object. Deleting a missing object is not an error.
    async fn delete_object(&self, key: &str) -> BlobResult<()>;

    /// Delete a batch of objects.
    async fn delete_objects(&self, keys: &[String]) -> BlobResult<()>;

    /// Open a multipart session for `key`, returning an opaque session
    /// handle. `labels` become backend-side object metadata.
    async fn create_multipart(&self, key: &str, labels: &[(String, String)])
    -> BlobResult<String>;

    /// Transfer one part, returning the backend's completion tag for it.
    async fn upload_part(
        &self,
        key: &str,
        session: &str,
        part_number: i32,
        data: Bytes,
    ) -> BlobResult<String>;

    /// Assemble the uploaded parts into the final object. `parts` must be
    /// ordered ascending by part number.
    async fn complete_multipart(
        &self,
        key: &str,
        session: &str,
        parts: &[PartTag],
    ) -> BlobResult<()>;

    /// Cancel a session and discard its transferred parts.
    async fn abort_multipart(&self, key: &str, session: &str) -> BlobResult<()>;
}
