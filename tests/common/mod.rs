//! Shared test helpers for file-vault integration tests.
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use uuid::Uuid;

use file_vault::AppState;
use file_vault::auth::TokenService;
use file_vault::blob::LocalBlobStore;

/// Create a test AppState with a temporary database and local blob store.
pub async fn test_state(temp_dir: &tempfile::TempDir) -> AppState {
    let db_path = temp_dir.path().join("meta.db");
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .expect("parsing sqlite url")
        .create_if_missing(true)
        .foreign_keys(true);
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .expect("opening test database"),
    );

    for stmt in include_str!("../../migrations/0001_init.sql")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        sqlx::query(stmt).execute(&*db).await.expect("migrating");
    }

    let blob = Arc::new(
        LocalBlobStore::new(temp_dir.path().join("blobs")).expect("creating blob store"),
    );
    let tokens = TokenService::new("test-secret", Duration::from_secs(3600));
    AppState::new(db, blob, tokens, Duration::from_secs(600))
}

/// Create a vault and shrink its capacity to `capacity_bytes`.
pub async fn vault_with_capacity(state: &AppState, name: &str, capacity_bytes: i64) -> Uuid {
    let vault = state
        .vaults
        .create_vault(name, "password")
        .await
        .expect("creating vault");
    sqlx::query("UPDATE vaults SET capacity_bytes = ? WHERE id = ?")
        .bind(capacity_bytes)
        .bind(vault.id)
        .execute(&*state.db)
        .await
        .expect("setting capacity");
    vault.id
}

pub async fn used_bytes(state: &AppState, vault_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT used_bytes FROM vaults WHERE id = ?")
        .bind(vault_id)
        .fetch_one(&*state.db)
        .await
        .expect("reading used_bytes")
}

pub async fn pending_upload_count(state: &AppState, vault_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM pending_uploads WHERE vault_id = ?")
        .bind(vault_id)
        .fetch_one(&*state.db)
        .await
        .expect("counting pending uploads")
}

pub async fn chunk_count(state: &AppState, upload_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM upload_chunks WHERE upload_id = ?")
        .bind(upload_id)
        .fetch_one(&*state.db)
        .await
        .expect("counting chunks")
}

/// Read the assembled bytes of a stored file through its download URL
/// (the local backend hands back a `file://` URI).
pub async fn read_stored_file(state: &AppState, vault_id: Uuid, file_id: Uuid) -> Vec<u8> {
    let (url, _) = state
        .files
        .download_url(vault_id, file_vault::auth::Role::Owner, file_id)
        .await
        .expect("presigning download url");
    let path = url.strip_prefix("file://").expect("local file url");
    std::fs::read(path).expect("reading stored file")
}
