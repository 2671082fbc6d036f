//! HTTP handlers for single-shot file operations.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    auth::Claims,
    errors::AppError,
    models::file::Visibility,
};

#[derive(Debug, Deserialize)]
pub struct FileUpdateReq {
    pub new_name: Option<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteReq {
    pub file_ids: Vec<Uuid>,
}

#[derive(Serialize)]
struct DownloadResp {
    download_url: String,
    valid_for_seconds: u64,
}

#[derive(Serialize)]
struct FileIdList {
    count: usize,
    file_ids: Vec<Uuid>,
}

#[derive(Serialize)]
struct BulkDeleteResp {
    deleted_files: FileIdList,
    files_not_found: FileIdList,
}

/// POST `/file/upload` — single-shot upload of a multipart-form `file` field.
pub async fn upload_file(
    State(state): State<AppState>,
    claims: Claims,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    claims.require_owner()?;

    let mut payload: Option<(String, Bytes)> = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::bad_request("malformed multipart body"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mut buf = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| AppError::bad_request("malformed multipart body"))?
        {
            buf.extend_from_slice(&chunk);
        }
        payload = Some((file_name, buf.freeze()));
    }

    let (file_name, data) =
        payload.ok_or_else(|| AppError::bad_request("missing `file` field"))?;
    let record = state.files.upload(claims.vault_id, &file_name, data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET `/file/{id}` — time-limited download URL for a file.
pub async fn download_file(
    State(state): State<AppState>,
    claims: Claims,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (download_url, valid_for_seconds) = state
        .files
        .download_url(claims.vault_id, claims.role, file_id)
        .await?;
    Ok(Json(DownloadResp {
        download_url,
        valid_for_seconds,
    }))
}

/// PATCH `/file/{id}` — rename a file and/or change its visibility.
pub async fn update_file(
    State(state): State<AppState>,
    claims: Claims,
    Path(file_id): Path<Uuid>,
    Json(req): Json<FileUpdateReq>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_owner()?;
    let record = state
        .files
        .update(
            claims.vault_id,
            file_id,
            req.new_name.as_deref(),
            req.visibility,
        )
        .await?;
    Ok(Json(record))
}

/// DELETE `/file/{id}` — delete a file and free its quota.
pub async fn delete_file(
    State(state): State<AppState>,
    claims: Claims,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_owner()?;
    state.files.delete(claims.vault_id, file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/file/bulk-delete` — delete a batch of files, reporting which
/// ids were found.
pub async fn bulk_delete(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<BulkDeleteReq>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_owner()?;
    let outcome = state
        .files
        .bulk_delete(claims.vault_id, &req.file_ids)
        .await?;
    Ok(Json(BulkDeleteResp {
        deleted_files: FileIdList {
            count: outcome.deleted.len(),
            file_ids: outcome.deleted,
        },
        files_not_found: FileIdList {
            count: outcome.not_found.len(),
            file_ids: outcome.not_found,
        },
    }))
}
