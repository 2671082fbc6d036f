//! HTTP handlers for vault lifecycle operations.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    auth::{Claims, Role},
    errors::AppError,
    models::file::FileRecord,
};

#[derive(Debug, Deserialize)]
pub struct CreateVaultReq {
    pub vault: String,
    pub password: String,
}

/// Login body. With a password the caller authenticates as owner;
/// without one they get a read-only guest token.
#[derive(Debug, Deserialize)]
pub struct LoginReq {
    pub vault: String,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVaultReq {
    pub new_name: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Serialize)]
struct MessageResp {
    message: String,
}

#[derive(Serialize)]
struct LoginResp {
    message: String,
    access_token: String,
    token_type: &'static str,
    role: Role,
}

#[derive(Serialize)]
struct VaultSummary {
    name: String,
    created_at: DateTime<Utc>,
    capacity_bytes: i64,
    used_bytes: i64,
}

#[derive(Serialize)]
struct VaultResp {
    vault: VaultSummary,
    files: Vec<FileRecord>,
}

/// POST `/vault/create` — create a vault.
pub async fn create_vault(
    State(state): State<AppState>,
    Json(req): Json<CreateVaultReq>,
) -> Result<impl IntoResponse, AppError> {
    state.vaults.create_vault(&req.vault, &req.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResp {
            message: "vault created successfully".into(),
        }),
    ))
}

/// POST `/vault/login` — exchange credentials for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<impl IntoResponse, AppError> {
    let (token, role) = state.vaults.login(&req.vault, req.password.as_deref()).await?;
    Ok(Json(LoginResp {
        message: "login successful".into(),
        access_token: token,
        token_type: "bearer",
        role,
    }))
}

/// GET `/vault` — vault summary plus its file list, filtered by role.
pub async fn get_vault(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, AppError> {
    let vault = state.vaults.fetch(claims.vault_id).await?;
    let files = state.files.list(claims.vault_id, claims.role).await?;
    Ok(Json(VaultResp {
        vault: VaultSummary {
            name: vault.name,
            created_at: vault.created_at,
            capacity_bytes: vault.capacity_bytes,
            used_bytes: vault.used_bytes,
        },
        files,
    }))
}

/// PATCH `/vault` — rename the vault and/or change its password.
pub async fn update_vault(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<UpdateVaultReq>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_owner()?;
    state
        .vaults
        .update(
            claims.vault_id,
            req.new_name.as_deref(),
            req.new_password.as_deref(),
        )
        .await?;
    Ok(Json(MessageResp {
        message: "vault updated successfully".into(),
    }))
}

/// DELETE `/vault` — delete the vault and everything in it.
pub async fn delete_vault(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, AppError> {
    claims.require_owner()?;
    state.vaults.delete(claims.vault_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
