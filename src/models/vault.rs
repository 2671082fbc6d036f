//! Represents a vault — a tenant's isolated, quota-bearing namespace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A password-protected vault.
///
/// The vault owns its files and in-flight uploads: deleting a vault
/// cascades to both. `used_bytes` is the storage ledger and is only ever
/// mutated in the same transaction as the metadata change that caused it.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Vault {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Globally unique, human-chosen vault name.
    pub name: String,

    /// bcrypt hash of the owner password. Never serialized to clients.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Storage quota in bytes.
    pub capacity_bytes: i64,

    /// Bytes currently committed to completed files. Invariant:
    /// `0 <= used_bytes <= capacity_bytes` after every commit.
    pub used_bytes: i64,

    /// When this vault was created.
    pub created_at: DateTime<Utc>,
}
