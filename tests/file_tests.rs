//! Integration tests for single-shot file operations and quota accounting.

mod common;

use bytes::Bytes;
use common::{read_stored_file, test_state, used_bytes, vault_with_capacity};
use file_vault::auth::Role;
use file_vault::errors::VaultError;
use file_vault::models::file::Visibility;
use uuid::Uuid;

#[tokio::test]
async fn upload_then_delete_returns_quota_and_removes_the_blob() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;
    let vault_id = vault_with_capacity(&state, "up-down", 1024 * 1024).await;

    let record = state
        .files
        .upload(vault_id, "notes.txt", Bytes::from(vec![42u8; 1000]))
        .await
        .unwrap();
    assert_eq!(record.size_bytes, 1000);
    assert_eq!(used_bytes(&state, vault_id).await, 1000);
    assert_eq!(
        read_stored_file(&state, vault_id, record.id).await,
        vec![42u8; 1000]
    );

    state.files.delete(vault_id, record.id).await.unwrap();
    assert_eq!(used_bytes(&state, vault_id).await, 0);

    // The blob went with the record: presigning the key now fails.
    let err = state
        .files
        .download_url(vault_id, Role::Owner, record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::FileNotFound));
}

#[tokio::test]
async fn upload_beyond_capacity_is_refused_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;
    let vault_id = vault_with_capacity(&state, "tiny", 500).await;

    let err = state
        .files
        .upload(vault_id, "big.bin", Bytes::from(vec![0u8; 501]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::InsufficientStorage {
            requested: 501,
            available: 500
        }
    ));

    assert_eq!(used_bytes(&state, vault_id).await, 0);
    let files = state.files.list(vault_id, Role::Owner).await.unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn guests_see_and_fetch_only_public_files() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;
    let vault_id = vault_with_capacity(&state, "shared", 1024 * 1024).await;

    let secret = state
        .files
        .upload(vault_id, "secret.txt", Bytes::from_static(b"private bytes"))
        .await
        .unwrap();
    let shared = state
        .files
        .upload(vault_id, "shared.txt", Bytes::from_static(b"public bytes"))
        .await
        .unwrap();
    state
        .files
        .update(vault_id, shared.id, None, Some(Visibility::Public))
        .await
        .unwrap();

    let visible = state.files.list(vault_id, Role::Guest).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, shared.id);

    let err = state
        .files
        .download_url(vault_id, Role::Guest, secret.id)
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Forbidden));

    let (url, _) = state
        .files
        .download_url(vault_id, Role::Guest, shared.id)
        .await
        .unwrap();
    assert!(url.starts_with("file://"));
}

#[tokio::test]
async fn rename_keeps_size_and_visibility_survives_rename() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;
    let vault_id = vault_with_capacity(&state, "rename", 1024 * 1024).await;

    let record = state
        .files
        .upload(vault_id, "draft.txt", Bytes::from_static(b"contents"))
        .await
        .unwrap();

    let renamed = state
        .files
        .update(vault_id, record.id, Some("final.txt"), None)
        .await
        .unwrap();
    assert_eq!(renamed.name, "final.txt");
    assert_eq!(renamed.size_bytes, record.size_bytes);
    assert_eq!(renamed.visibility, Visibility::Private);

    let err = state
        .files
        .update(vault_id, Uuid::new_v4(), Some("ghost.txt"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::FileNotFound));
}

#[tokio::test]
async fn files_in_other_vaults_are_invisible() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;
    let vault_a = vault_with_capacity(&state, "vault-a", 1024 * 1024).await;
    let vault_b = vault_with_capacity(&state, "vault-b", 1024 * 1024).await;

    let record = state
        .files
        .upload(vault_a, "mine.txt", Bytes::from_static(b"hello"))
        .await
        .unwrap();

    // The other vault's token cannot see, fetch, or delete the file.
    let err = state
        .files
        .download_url(vault_b, Role::Owner, record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::FileNotFound));
    let err = state.files.delete(vault_b, record.id).await.unwrap_err();
    assert!(matches!(err, VaultError::FileNotFound));
    assert_eq!(used_bytes(&state, vault_a).await, 5);
}

#[tokio::test]
async fn bulk_delete_reports_found_and_missing_ids() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;
    let vault_id = vault_with_capacity(&state, "bulk", 1024 * 1024).await;

    let keep = state
        .files
        .upload(vault_id, "keep.txt", Bytes::from(vec![1u8; 100]))
        .await
        .unwrap();
    let drop_a = state
        .files
        .upload(vault_id, "a.txt", Bytes::from(vec![2u8; 200]))
        .await
        .unwrap();
    let drop_b = state
        .files
        .upload(vault_id, "b.txt", Bytes::from(vec![3u8; 300]))
        .await
        .unwrap();
    let ghost = Uuid::new_v4();

    let outcome = state
        .files
        .bulk_delete(vault_id, &[drop_a.id, drop_b.id, ghost])
        .await
        .unwrap();

    assert_eq!(outcome.deleted.len(), 2);
    assert!(outcome.deleted.contains(&drop_a.id));
    assert!(outcome.deleted.contains(&drop_b.id));
    assert_eq!(outcome.not_found, vec![ghost]);

    // Only the kept file still counts against the ledger.
    assert_eq!(used_bytes(&state, vault_id).await, 100);
    let files = state.files.list(vault_id, Role::Owner).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, keep.id);
}
