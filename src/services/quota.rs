//! Vault storage ledger.
//!
//! Both functions run on the caller's transaction so the counter moves
//! atomically with the metadata change that caused it. `reserve` is a
//! conditional update: the `used_bytes + n <= capacity_bytes` guard is
//! evaluated inside the database, which keeps the quota invariant intact
//! even when two admissions race past the same advisory capacity check.

use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

use crate::errors::{VaultError, VaultResult};

/// Count `bytes` against the vault quota, failing without side effects
/// when the vault would overflow its capacity.
pub async fn reserve(
    tx: &mut Transaction<'_, Sqlite>,
    vault_id: Uuid,
    bytes: i64,
) -> VaultResult<()> {
    let result = sqlx::query(
        "UPDATE vaults SET used_bytes = used_bytes + ?
         WHERE id = ? AND used_bytes + ? <= capacity_bytes",
    )
    .bind(bytes)
    .bind(vault_id)
    .bind(bytes)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT capacity_bytes, used_bytes FROM vaults WHERE id = ?")
                .bind(vault_id)
                .fetch_optional(&mut **tx)
                .await?;
        return match row {
            Some((capacity, used)) => Err(VaultError::InsufficientStorage {
                requested: bytes,
                available: (capacity - used).max(0),
            }),
            None => Err(VaultError::VaultNotFound),
        };
    }
    Ok(())
}

/// Return `bytes` to the vault quota after file metadata was removed.
pub async fn release(
    tx: &mut Transaction<'_, Sqlite>,
    vault_id: Uuid,
    bytes: i64,
) -> VaultResult<()> {
    sqlx::query("UPDATE vaults SET used_bytes = MAX(used_bytes - ?, 0) WHERE id = ?")
        .bind(bytes)
        .bind(vault_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
