//! Represents a completed file stored in a vault.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Who may fetch a file's download URL.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Visibility {
    /// Owner only.
    Private,
    /// Owner and guests.
    Public,
}

/// Metadata for one stored file.
///
/// The record id doubles as the blob store object key, chosen at
/// metadata-creation time so the two stores share a correlation key.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct FileRecord {
    /// Internal UUID, also the blob store object key.
    pub id: Uuid,

    /// Owning vault.
    pub vault_id: Uuid,

    /// Display name shown to clients and used as the download filename.
    pub name: String,

    /// Size in bytes, counted against the vault quota.
    pub size_bytes: i64,

    /// Private or public.
    pub visibility: Visibility,

    /// When the file was committed.
    pub created_at: DateTime<Utc>,
}
