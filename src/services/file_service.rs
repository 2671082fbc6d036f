//! Single-shot file operations: upload, download URLs, rename and
//! visibility changes, deletion, bulk deletion.
//!
//! Every quota mutation shares a transaction with the metadata change
//! that caused it. Blob transfers happen outside those transactions;
//! an upload whose transfer fails is compensated by a second
//! transaction that removes the record and returns the reserved bytes.

use bytes::Bytes;
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::auth::Role;
use crate::blob::BlobStore;
use crate::errors::{VaultError, VaultResult};
use crate::models::file::{FileRecord, Visibility};
use crate::services::quota;

/// Outcome of a bulk delete: which of the requested ids were removed and
/// which were not found in the caller's vault.
#[derive(Debug)]
pub struct BulkDeleteOutcome {
    pub deleted: Vec<Uuid>,
    pub not_found: Vec<Uuid>,
}

#[derive(Clone)]
pub struct FileService {
    pub db: Arc<SqlitePool>,
    pub blob: Arc<dyn BlobStore>,
    download_ttl: Duration,
}

impl FileService {
    pub fn new(db: Arc<SqlitePool>, blob: Arc<dyn BlobStore>, download_ttl: Duration) -> Self {
        Self {
            db,
            blob,
            download_ttl,
        }
    }

    /// Store a file in one shot.
    ///
    /// Record + quota commit first; the transfer follows. A failed
    /// transfer rolls the metadata back in a compensating transaction so
    /// no record ever describes bytes that were never stored.
    pub async fn upload(
        &self,
        vault_id: Uuid,
        file_name: &str,
        data: Bytes,
    ) -> VaultResult<FileRecord> {
        let record = FileRecord {
            id: Uuid::new_v4(),
            vault_id,
            name: file_name.to_string(),
            size_bytes: data.len() as i64,
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
        quota::reserve(&mut tx, vault_id, record.size_bytes).await?;
        tx.commit().await?;

        if let Err(err) = self.blob.put_object(&record.id.to_string(), data).await {
            let mut tx = self.db.begin().await?;
            sqlx::query("DELETE FROM files WHERE id = ?")
                .bind(record.id)
                .execute(&mut *tx)
                .await?;
            quota::release(&mut tx, vault_id, record.size_bytes).await?;
            tx.commit().await?;
            return Err(err.into());
        }

        Ok(record)
    }

    /// List a vault's files; guests only see public ones.
    pub async fn list(&self, vault_id: Uuid, role: Role) -> VaultResult<Vec<FileRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, vault_id, name, size_bytes, visibility, created_at
             FROM files WHERE vault_id = ",
        );
        builder.push_bind(vault_id);
        if role == Role::Guest {
            builder.push(" AND visibility = ");
            builder.push_bind(Visibility::Public);
        }
        builder.push(" ORDER BY created_at ASC");

        Ok(builder.build_query_as().fetch_all(&*self.db).await?)
    }

    /// Produce a time-limited download URL for a file.
    ///
    /// Guests may only fetch public files.
    pub async fn download_url(
        &self,
        vault_id: Uuid,
        role: Role,
        file_id: Uuid,
    ) -> VaultResult<(String, u64)> {
        let record = self.fetch(vault_id, file_id).await?;
        if role == Role::Guest && record.visibility != Visibility::Public {
            return Err(VaultError::Forbidden);
        }

        let url = self
            .blob
            .presigned_get_url(&record.id.to_string(), &record.name, self.download_ttl)
            .await?;
        Ok((url, self.download_ttl.as_secs()))
    }

    /// Rename a file and/or change its visibility.
    pub async fn update(
        &self,
        vault_id: Uuid,
        file_id: Uuid,
        new_name: Option<&str>,
        visibility: Option<Visibility>,
    ) -> VaultResult<FileRecord> {
        let result = sqlx::query(
            "UPDATE files SET name = COALESCE(?, name), visibility = COALESCE(?, visibility)
             WHERE id = ? AND vault_id = ?",
        )
        .bind(new_name)
        .bind(visibility)
        .bind(file_id)
        .bind(vault_id)
        .execute(&*self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(VaultError::FileNotFound);
        }

        self.fetch(vault_id, file_id).await
    }

    /// Delete a file and return its quota to the vault.
    ///
    /// Record removal and the ledger decrement commit together; the blob
    /// delete afterwards is best-effort and retried out-of-band if it
    /// fails, since the metadata already says the file is gone.
    pub async fn delete(&self, vault_id: Uuid, file_id: Uuid) -> VaultResult<FileRecord> {
        let record = self.fetch(vault_id, file_id).await?;

        let mut tx = self.db.begin().await?;
        let result = sqlx::query("DELETE FROM files WHERE id = ? AND vault_id = ?")
            .bind(file_id)
            .bind(vault_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(VaultError::FileNotFound);
        }
        quota::release(&mut tx, vault_id, record.size_bytes).await?;
        tx.commit().await?;

        if let Err(err) = self.blob.delete_object(&file_id.to_string()).await {
            warn!("blob delete for file {} failed: {}", file_id, err);
        }

        Ok(record)
    }

    /// Delete a batch of files, reporting which ids were actually found.
    pub async fn bulk_delete(
        &self,
        vault_id: Uuid,
        file_ids: &[Uuid],
    ) -> VaultResult<BulkDeleteOutcome> {
        if file_ids.is_empty() {
            return Ok(BulkDeleteOutcome {
                deleted: Vec::new(),
                not_found: Vec::new(),
            });
        }

        let mut tx = self.db.begin().await?;

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, size_bytes FROM files WHERE vault_id = ",
        );
        builder.push_bind(vault_id);
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in file_ids {
            separated.push_bind(*id);
        }
        builder.push(")");
        let found: Vec<(Uuid, i64)> = builder.build_query_as().fetch_all(&mut *tx).await?;

        let deleted: Vec<Uuid> = found.iter().map(|(id, _)| *id).collect();
        let freed: i64 = found.iter().map(|(_, size)| size).sum();

        if !deleted.is_empty() {
            let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM files WHERE vault_id = ");
            builder.push_bind(vault_id);
            builder.push(" AND id IN (");
            let mut separated = builder.separated(", ");
            for id in &deleted {
                separated.push_bind(*id);
            }
            builder.push(")");
            builder.build().execute(&mut *tx).await?;

            quota::release(&mut tx, vault_id, freed).await?;
        }
        tx.commit().await?;

        let keys: Vec<String> = deleted.iter().map(|id| id.to_string()).collect();
        if let Err(err) = self.blob.delete_objects(&keys).await {
            warn!("blob cleanup after bulk delete failed: {}", err);
        }

        let not_found = file_ids
            .iter()
            .filter(|id| !deleted.contains(id))
            .copied()
            .collect();
        Ok(BulkDeleteOutcome { deleted, not_found })
    }

    /// Fetch a file record scoped to the caller's vault.
    async fn fetch(&self, vault_id: Uuid, file_id: Uuid) -> VaultResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, vault_id, name, size_bytes, visibility, created_at
             FROM files WHERE id = ? AND vault_id = ?",
        )
        .bind(file_id)
        .bind(vault_id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(VaultError::FileNotFound)
    }
}
