//! Vault lifecycle: creation, login, fetch, rename / password change,
//! deletion. Deletion cascades metadata through the database and then
//! cleans the blob store up best-effort; metadata is the source of
//! truth for what should exist.

use chrono::Utc;
use futures::future::join_all;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{self, Role, TokenService};
use crate::blob::BlobStore;
use crate::errors::{VaultError, VaultResult};
use crate::models::vault::Vault;

/// Storage granted to every new vault: 500 MiB.
pub const DEFAULT_VAULT_CAPACITY: i64 = 500 * 1024 * 1024;

const VAULT_NAME_MAX_LEN: usize = 64;

#[derive(Clone)]
pub struct VaultService {
    pub db: Arc<SqlitePool>,
    pub blob: Arc<dyn BlobStore>,
    tokens: TokenService,
}

impl VaultService {
    pub fn new(db: Arc<SqlitePool>, blob: Arc<dyn BlobStore>, tokens: TokenService) -> Self {
        Self { db, blob, tokens }
    }

    /// Validate vault name format.
    ///
    /// Names are human-chosen and globally unique: 1–64 characters,
    /// letters, digits, dots, hyphens, and underscores only.
    fn ensure_vault_name_safe(name: &str) -> VaultResult<()> {
        if name.is_empty() || name.len() > VAULT_NAME_MAX_LEN {
            return Err(VaultError::InvalidVaultName {
                name: name.to_string(),
                reason: format!("must be between 1 and {} characters", VAULT_NAME_MAX_LEN),
            });
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(VaultError::InvalidVaultName {
                name: name.to_string(),
                reason: "allowed characters are letters, digits, dots, hyphens, and underscores"
                    .into(),
            });
        }
        Ok(())
    }

    /// Create a vault with the default capacity.
    ///
    /// Returns VaultAlreadyExists on a name collision.
    pub async fn create_vault(&self, name: &str, password: &str) -> VaultResult<Vault> {
        Self::ensure_vault_name_safe(name)?;
        let vault = Vault {
            id: Uuid::new_v4(),
            name: name.to_string(),
            password_hash: auth::hash_password(password)?,
            capacity_bytes: DEFAULT_VAULT_CAPACITY,
            used_bytes: 0,
            created_at: Utc::now(),
        };

        match sqlx::query(
            "INSERT INTO vaults (id, name, password_hash, capacity_bytes, used_bytes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(vault.id)
        .bind(&vault.name)
        .bind(&vault.password_hash)
        .bind(vault.capacity_bytes)
        .bind(vault.used_bytes)
        .bind(vault.created_at)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(vault),
            Err(err) if is_unique_violation(&err) => {
                Err(VaultError::VaultAlreadyExists(name.to_string()))
            }
            Err(err) => Err(VaultError::Sqlx(err)),
        }
    }

    /// Log in to a vault.
    ///
    /// With a password: verified against the stored hash, issuing an
    /// owner token. Without one: any valid vault name gets a read-only
    /// guest token. Both failure modes collapse into InvalidCredentials
    /// so callers cannot probe for vault existence.
    pub async fn login(&self, name: &str, password: Option<&str>) -> VaultResult<(String, Role)> {
        let vault = self.fetch_by_name(name).await?;

        let role = match password {
            Some(password) => {
                if auth::verify_password(password, &vault.password_hash)? {
                    Role::Owner
                } else {
                    return Err(VaultError::InvalidCredentials);
                }
            }
            None => Role::Guest,
        };

        let token = self.tokens.issue(vault.id, role)?;
        Ok((token, role))
    }

    /// Fetch a vault by id.
    pub async fn fetch(&self, vault_id: Uuid) -> VaultResult<Vault> {
        sqlx::query_as::<_, Vault>(
            "SELECT id, name, password_hash, capacity_bytes, used_bytes, created_at
             FROM vaults WHERE id = ?",
        )
        .bind(vault_id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(VaultError::VaultNotFound)
    }

    /// Rename the vault and/or replace its password.
    pub async fn update(
        &self,
        vault_id: Uuid,
        new_name: Option<&str>,
        new_password: Option<&str>,
    ) -> VaultResult<Vault> {
        if let Some(name) = new_name {
            Self::ensure_vault_name_safe(name)?;
            let result = sqlx::query("UPDATE vaults SET name = ? WHERE id = ?")
                .bind(name)
                .bind(vault_id)
                .execute(&*self.db)
                .await;
            match result {
                Ok(res) if res.rows_affected() == 0 => return Err(VaultError::VaultNotFound),
                Ok(_) => {}
                Err(err) if is_unique_violation(&err) => {
                    return Err(VaultError::VaultAlreadyExists(name.to_string()));
                }
                Err(err) => return Err(VaultError::Sqlx(err)),
            }
        }

        if let Some(password) = new_password {
            let hash = auth::hash_password(password)?;
            let result = sqlx::query("UPDATE vaults SET password_hash = ? WHERE id = ?")
                .bind(&hash)
                .bind(vault_id)
                .execute(&*self.db)
                .await?;
            if result.rows_affected() == 0 {
                return Err(VaultError::VaultNotFound);
            }
        }

        self.fetch(vault_id).await
    }

    /// Delete a vault, its files, and its in-flight uploads.
    ///
    /// The database delete cascades to files, pending uploads, and
    /// chunks. Blob-side cleanup (object deletion, session aborts) runs
    /// afterwards and is best-effort: failures are logged, never
    /// surfaced, since the metadata is already gone.
    pub async fn delete(&self, vault_id: Uuid) -> VaultResult<()> {
        let file_keys: Vec<String> = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM files WHERE vault_id = ?",
        )
        .bind(vault_id)
        .fetch_all(&*self.db)
        .await?
        .into_iter()
        .map(|id| id.to_string())
        .collect();

        let sessions: Vec<(Uuid, Option<String>)> =
            sqlx::query_as("SELECT id, session_handle FROM pending_uploads WHERE vault_id = ?")
                .bind(vault_id)
                .fetch_all(&*self.db)
                .await?;

        let result = sqlx::query("DELETE FROM vaults WHERE id = ?")
            .bind(vault_id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(VaultError::VaultNotFound);
        }

        if let Err(err) = self.blob.delete_objects(&file_keys).await {
            warn!("blob cleanup after vault delete failed: {}", err);
        }

        let aborts = sessions
            .iter()
            .filter_map(|(upload_id, handle)| {
                handle.as_deref().map(|session| {
                    let key = upload_id.to_string();
                    let session = session.to_string();
                    async move { self.blob.abort_multipart(&key, &session).await }
                })
            })
            .collect::<Vec<_>>();
        for outcome in join_all(aborts).await {
            if let Err(err) = outcome {
                warn!("aborting stale multipart session failed: {}", err);
            }
        }

        Ok(())
    }

    async fn fetch_by_name(&self, name: &str) -> VaultResult<Vault> {
        sqlx::query_as::<_, Vault>(
            "SELECT id, name, password_hash, capacity_bytes, used_bytes, created_at
             FROM vaults WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(VaultError::InvalidCredentials)
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
