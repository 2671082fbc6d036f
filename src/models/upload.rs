//! Represents in-flight multipart upload sessions and their parts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A multipart upload session, initiated before uploading large files in
/// parts.
///
/// The id becomes the `FileRecord` id (and therefore the object key) when
/// the upload completes. Completion consumes the row, so a second
/// completion of the same id fails as not-found.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct PendingUpload {
    /// Internal UUID, future file id and object key.
    pub id: Uuid,

    /// Owning vault.
    pub vault_id: Uuid,

    /// File name declared at initiation.
    pub file_name: String,

    /// Total byte size the client declared; verified against the sum of
    /// chunk sizes before completion.
    pub declared_size: i64,

    /// Number of parts the client intends to send, when declared.
    /// Non-final parts are held to the minimum part size only when this
    /// is present.
    pub part_count: Option<i32>,

    /// Backend-issued multipart session handle. Set in the same
    /// transaction that creates the row; never null once committed.
    pub session_handle: Option<String>,

    /// Timestamp when the upload was initiated.
    pub created_at: DateTime<Utc>,
}

/// One successfully transferred part of a multipart upload.
///
/// Unique per `(upload_id, part_number)`; a resubmitted part replaces its
/// record so the completion size check stays correct.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ChunkRecord {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Owning vault.
    pub vault_id: Uuid,

    /// Reference to the parent upload session.
    pub upload_id: Uuid,

    /// Part number (1-based).
    pub part_number: i32,

    /// Size in bytes.
    pub size_bytes: i64,

    /// Backend-issued completion tag for this part.
    pub etag: String,

    /// Timestamp when this part was uploaded.
    pub uploaded_at: DateTime<Utc>,
}
