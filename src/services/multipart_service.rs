//! Multipart upload coordination.
//!
//! Drives an upload session through initiate → chunk submissions →
//! complete or abort, reconciling three parties that share no
//! transaction boundary: the client's declared intent, the metadata
//! ledger, and the blob backend's native multipart protocol.
//!
//! State lives in two tables. `pending_uploads` records the session
//! (declared size, backend handle); `upload_chunks` records each
//! transferred part with the backend's completion tag. Completion
//! verifies the transferred total against the declaration, replays the
//! accumulated tags to the backend in ascending part order, and then in
//! a single transaction promotes the session into a file record and
//! charges the vault ledger. The gap between the backend's completion
//! and that commit is the one window where the two stores can disagree;
//! everywhere else a failure leaves local state untouched and the
//! operation retryable.

use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::blob::{BlobStore, PartTag};
use crate::errors::{VaultError, VaultResult};
use crate::models::file::{FileRecord, Visibility};
use crate::models::upload::{ChunkRecord, PendingUpload};
use crate::services::quota;

/// Smallest size the backend accepts for a non-final part: 5 MiB.
pub const MIN_PART_SIZE: i64 = 5 * 1024 * 1024;

#[derive(Clone)]
pub struct MultipartCoordinator {
    pub db: Arc<SqlitePool>,
    pub blob: Arc<dyn BlobStore>,
}

impl MultipartCoordinator {
    pub fn new(db: Arc<SqlitePool>, blob: Arc<dyn BlobStore>) -> Self {
        Self { db, blob }
    }

    /// Open a multipart upload session.
    ///
    /// Admission-checks the declared size against the vault's remaining
    /// capacity, then creates the session row and the backend session
    /// together. The insert transaction is deliberately held across the
    /// backend call (the one exception to the rule that transactions
    /// never span blob calls) so a backend failure rolls the row back
    /// and no session ever exists without a valid handle.
    pub async fn initiate(
        &self,
        vault_id: Uuid,
        file_name: &str,
        declared_size: i64,
        part_count: Option<i32>,
    ) -> VaultResult<Uuid> {
        if declared_size <= 0 {
            return Err(VaultError::InvalidSize(declared_size));
        }
        if let Some(count) = part_count {
            if count < 1 {
                return Err(VaultError::InvalidPartNumber(count));
            }
        }

        let mut tx = self.db.begin().await?;

        let capacity: Option<(i64, i64)> =
            sqlx::query_as("SELECT capacity_bytes, used_bytes FROM vaults WHERE id = ?")
                .bind(vault_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (capacity_bytes, used_bytes) = capacity.ok_or(VaultError::VaultNotFound)?;
        if used_bytes + declared_size > capacity_bytes {
            return Err(VaultError::InsufficientStorage {
                requested: declared_size,
                available: (capacity_bytes - used_bytes).max(0),
            });
        }

        let upload_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO pending_uploads
                 (id, vault_id, file_name, declared_size, part_count, session_handle, created_at)
             VALUES (?, ?, ?, ?, ?, NULL, ?)",
        )
        .bind(upload_id)
        .bind(vault_id)
        .bind(file_name)
        .bind(declared_size)
        .bind(part_count)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let labels = [
            ("vault_id".to_string(), vault_id.to_string()),
            ("filename".to_string(), file_name.to_string()),
        ];
        let handle = self
            .blob
            .create_multipart(&upload_id.to_string(), &labels)
            .await?;

        sqlx::query("UPDATE pending_uploads SET session_handle = ? WHERE id = ?")
            .bind(&handle)
            .bind(upload_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("initiated multipart upload {} for vault {}", upload_id, vault_id);
        Ok(upload_id)
    }

    /// Transfer one part and record its completion tag.
    ///
    /// Parts may arrive in any order. A resubmitted part number replaces
    /// its earlier record so the completion size check stays correct.
    /// The minimum-part-size rule applies to non-final parts, which are
    /// only identifiable when the client declared a part count at
    /// initiation; without one, enforcement is left to the backend's own
    /// rejection at completion time.
    pub async fn submit_chunk(
        &self,
        vault_id: Uuid,
        upload_id: Uuid,
        part_number: i32,
        data: Bytes,
    ) -> VaultResult<ChunkRecord> {
        if part_number < 1 {
            return Err(VaultError::InvalidPartNumber(part_number));
        }

        let upload = self.fetch_upload(vault_id, upload_id).await?;
        let chunk_size = data.len() as i64;

        if let Some(count) = upload.part_count {
            if part_number > count {
                return Err(VaultError::PartOutOfRange {
                    part_number,
                    part_count: count,
                });
            }
            if part_number < count && chunk_size < MIN_PART_SIZE {
                return Err(VaultError::ChunkTooSmall {
                    part_number,
                    size: chunk_size,
                });
            }
        }

        let handle = session_handle(&upload)?;
        let etag = self
            .blob
            .upload_part(&upload_id.to_string(), &handle, part_number, data)
            .await?;

        let record = ChunkRecord {
            id: Uuid::new_v4(),
            vault_id,
            upload_id,
            part_number,
            size_bytes: chunk_size,
            etag,
            uploaded_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO upload_chunks
                 (id, vault_id, upload_id, part_number, size_bytes, etag, uploaded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(upload_id, part_number) DO UPDATE SET
                 size_bytes = excluded.size_bytes,
                 etag = excluded.etag,
                 uploaded_at = excluded.uploaded_at",
        )
        .bind(record.id)
        .bind(record.vault_id)
        .bind(record.upload_id)
        .bind(record.part_number)
        .bind(record.size_bytes)
        .bind(&record.etag)
        .bind(record.uploaded_at)
        .execute(&*self.db)
        .await?;

        Ok(record)
    }

    /// Finish an upload session, promoting it into a file record.
    ///
    /// The transferred chunk sizes must sum exactly to the declared
    /// total; on a mismatch the session and its chunks are preserved so
    /// the client can submit what is missing or abort. The backend
    /// completion call receives the parts sorted ascending by part
    /// number regardless of submission order. Once the backend confirms,
    /// one transaction inserts the file record under the upload's id,
    /// deletes the session (cascading its chunks), and charges the vault
    /// ledger.
    pub async fn complete(&self, vault_id: Uuid, upload_id: Uuid) -> VaultResult<FileRecord> {
        let upload = self.fetch_upload(vault_id, upload_id).await?;

        let chunks: Vec<(i32, i64, String)> = sqlx::query_as(
            "SELECT part_number, size_bytes, etag FROM upload_chunks
             WHERE upload_id = ? AND vault_id = ?
             ORDER BY part_number ASC",
        )
        .bind(upload_id)
        .bind(vault_id)
        .fetch_all(&*self.db)
        .await?;
        if chunks.is_empty() {
            return Err(VaultError::NoChunks);
        }

        let transferred: i64 = chunks.iter().map(|(_, size, _)| size).sum();
        if transferred != upload.declared_size {
            return Err(VaultError::SizeMismatch {
                declared: upload.declared_size,
                actual: transferred,
            });
        }

        let parts: Vec<PartTag> = chunks
            .into_iter()
            .map(|(part_number, _, tag)| PartTag { part_number, tag })
            .collect();
        let handle = session_handle(&upload)?;
        self.blob
            .complete_multipart(&upload_id.to_string(), &handle, &parts)
            .await?;

        let record = FileRecord {
            id: upload_id,
            vault_id,
            name: upload.file_name.clone(),
            size_bytes: upload.declared_size,
            visibility: Visibility::Private,
            created_at: Utc::now(),
        };

        let mut tx = self.db.begin().await?;
        sqlx::query(
            "INSERT INTO files (id, vault_id, name, size_bytes, visibility, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(record.vault_id)
        .bind(&record.name)
        .bind(record.size_bytes)
        .bind(record.visibility)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM pending_uploads WHERE id = ?")
            .bind(upload_id)
            .execute(&mut *tx)
            .await?;
        quota::reserve(&mut tx, vault_id, record.size_bytes).await?;
        tx.commit().await?;

        debug!("completed multipart upload {} ({} bytes)", upload_id, record.size_bytes);
        Ok(record)
    }

    /// Cancel an upload session.
    ///
    /// The backend abort runs first; only after it succeeds is the
    /// session row (and its chunks, by cascade) deleted. The ledger is
    /// untouched: nothing was ever charged for an incomplete upload.
    pub async fn abort(&self, vault_id: Uuid, upload_id: Uuid) -> VaultResult<()> {
        let upload = self.fetch_upload(vault_id, upload_id).await?;

        let handle = session_handle(&upload)?;
        self.blob
            .abort_multipart(&upload_id.to_string(), &handle)
            .await?;

        sqlx::query("DELETE FROM pending_uploads WHERE id = ? AND vault_id = ?")
            .bind(upload_id)
            .bind(vault_id)
            .execute(&*self.db)
            .await?;

        debug!("aborted multipart upload {}", upload_id);
        Ok(())
    }

    /// Fetch an upload session scoped to the caller's vault.
    async fn fetch_upload(&self, vault_id: Uuid, upload_id: Uuid) -> VaultResult<PendingUpload> {
        sqlx::query_as::<_, PendingUpload>(
            "SELECT id, vault_id, file_name, declared_size, part_count, session_handle, created_at
             FROM pending_uploads WHERE id = ? AND vault_id = ?",
        )
        .bind(upload_id)
        .bind(vault_id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(VaultError::UploadNotFound)
    }
}

fn session_handle(upload: &PendingUpload) -> VaultResult<String> {
    upload
        .session_handle
        .clone()
        .ok_or_else(|| VaultError::Internal(format!("upload {} has no session handle", upload.id)))
}
