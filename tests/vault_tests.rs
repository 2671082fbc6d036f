//! Integration tests for vault lifecycle and authentication flows.

mod common;

use bytes::Bytes;
use common::{pending_upload_count, test_state, vault_with_capacity};
use file_vault::auth::Role;
use file_vault::errors::VaultError;

#[tokio::test]
async fn create_then_login_as_owner_and_guest() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;

    let vault = state
        .vaults
        .create_vault("family-photos", "correct horse")
        .await
        .unwrap();

    let (token, role) = state
        .vaults
        .login("family-photos", Some("correct horse"))
        .await
        .unwrap();
    assert_eq!(role, Role::Owner);
    let claims = state.tokens.verify(&token).unwrap();
    assert_eq!(claims.vault_id, vault.id);
    assert_eq!(claims.role, Role::Owner);

    let (_, role) = state.vaults.login("family-photos", None).await.unwrap();
    assert_eq!(role, Role::Guest);

    let err = state
        .vaults
        .login("family-photos", Some("wrong password"))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::InvalidCredentials));

    let err = state
        .vaults
        .login("no-such-vault", None)
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::InvalidCredentials));
}

#[tokio::test]
async fn duplicate_vault_names_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;

    state.vaults.create_vault("taken", "pw-one").await.unwrap();
    let err = state
        .vaults
        .create_vault("taken", "pw-two")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::VaultAlreadyExists(name) if name == "taken"));
}

#[tokio::test]
async fn invalid_vault_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;

    let too_long = "x".repeat(65);
    for name in ["", "has space", "slash/name", too_long.as_str()] {
        let err = state.vaults.create_vault(name, "pw").await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidVaultName { .. }), "{:?}", name);
    }
}

#[tokio::test]
async fn rename_and_password_change() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;

    let vault = state
        .vaults
        .create_vault("old-name", "old password")
        .await
        .unwrap();
    state.vaults.create_vault("occupied", "pw").await.unwrap();

    // Renaming onto a taken name conflicts.
    let err = state
        .vaults
        .update(vault.id, Some("occupied"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::VaultAlreadyExists(_)));

    let updated = state
        .vaults
        .update(vault.id, Some("new-name"), Some("new password"))
        .await
        .unwrap();
    assert_eq!(updated.name, "new-name");

    // Old credentials are gone, new ones work.
    let err = state
        .vaults
        .login("new-name", Some("old password"))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::InvalidCredentials));
    let (_, role) = state
        .vaults
        .login("new-name", Some("new password"))
        .await
        .unwrap();
    assert_eq!(role, Role::Owner);
}

#[tokio::test]
async fn vault_delete_cascades_to_files_uploads_and_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;
    let vault_id = vault_with_capacity(&state, "condemned", 100 * 1024 * 1024).await;

    state
        .files
        .upload(vault_id, "file.txt", Bytes::from(vec![1u8; 128]))
        .await
        .unwrap();
    let upload_id = state
        .multipart
        .initiate(vault_id, "inflight.bin", 1024, None)
        .await
        .unwrap();
    state
        .multipart
        .submit_chunk(vault_id, upload_id, 1, Bytes::from(vec![2u8; 1024]))
        .await
        .unwrap();

    state.vaults.delete(vault_id).await.unwrap();

    let files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE vault_id = ?")
        .bind(vault_id)
        .fetch_one(&*state.db)
        .await
        .unwrap();
    assert_eq!(files, 0);
    assert_eq!(pending_upload_count(&state, vault_id).await, 0);
    let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM upload_chunks WHERE vault_id = ?")
        .bind(vault_id)
        .fetch_one(&*state.db)
        .await
        .unwrap();
    assert_eq!(chunks, 0);

    let err = state.vaults.fetch(vault_id).await.unwrap_err();
    assert!(matches!(err, VaultError::VaultNotFound));
}

#[tokio::test]
async fn deleting_a_missing_vault_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir).await;

    let err = state.vaults.delete(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, VaultError::VaultNotFound));
}
