//! HTTP handlers for the multipart upload flow.
//!
//! - POST   /file/multipart/initiate       — open an upload session
//! - PUT    /file/multipart/{id}/chunk     — submit one part
//! - POST   /file/multipart/{id}/complete  — assemble and commit
//! - DELETE /file/multipart/{id}/abort     — cancel and clean up

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::Claims, errors::AppError, models::file::FileRecord};

#[derive(Debug, Deserialize)]
pub struct InitiateReq {
    pub file_name: String,
    pub file_size: i64,
    /// Optional; when present, non-final parts are held to the minimum
    /// part size up front instead of failing at completion.
    pub part_count: Option<i32>,
}

#[derive(Serialize)]
struct InitiateResp {
    message: String,
    file_id: Uuid,
}

#[derive(Serialize)]
struct MessageResp {
    message: String,
}

#[derive(Serialize)]
struct CompleteResp {
    message: String,
    file: FileRecord,
}

/// POST `/file/multipart/initiate` — open a session, returning the id the
/// client uses for every subsequent call.
pub async fn initiate(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<InitiateReq>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_owner()?;
    let file_id = state
        .multipart
        .initiate(claims.vault_id, &req.file_name, req.file_size, req.part_count)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(InitiateResp {
            message: "multipart upload initiated successfully".into(),
            file_id,
        }),
    ))
}

/// PUT `/file/multipart/{id}/chunk` — submit one part as a multipart form
/// with a `part_number` field and a `blob` field carrying the bytes.
pub async fn upload_chunk(
    State(state): State<AppState>,
    claims: Claims,
    Path(upload_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    claims.require_owner()?;

    let mut part_number: Option<i32> = None;
    let mut blob: Option<Bytes> = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::bad_request("malformed multipart body"))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("part_number") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("malformed multipart body"))?;
                part_number = Some(
                    text.parse::<i32>()
                        .map_err(|_| AppError::bad_request("part_number must be an integer"))?,
                );
            }
            Some("blob") => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|_| AppError::bad_request("malformed multipart body"))?
                {
                    buf.extend_from_slice(&chunk);
                }
                blob = Some(buf.freeze());
            }
            _ => {}
        }
    }

    let part_number =
        part_number.ok_or_else(|| AppError::bad_request("missing `part_number` field"))?;
    let blob = blob.ok_or_else(|| AppError::bad_request("missing `blob` field"))?;

    state
        .multipart
        .submit_chunk(claims.vault_id, upload_id, part_number, blob)
        .await?;
    Ok(Json(MessageResp {
        message: "chunk uploaded successfully".into(),
    }))
}

/// POST `/file/multipart/{id}/complete` — verify, assemble, and commit.
pub async fn complete(
    State(state): State<AppState>,
    claims: Claims,
    Path(upload_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_owner()?;
    let file = state.multipart.complete(claims.vault_id, upload_id).await?;
    Ok(Json(CompleteResp {
        message: "file uploaded successfully".into(),
        file,
    }))
}

/// DELETE `/file/multipart/{id}/abort` — cancel the session.
pub async fn abort(
    State(state): State<AppState>,
    claims: Claims,
    Path(upload_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_owner()?;
    state.multipart.abort(claims.vault_id, upload_id).await?;
    Ok(Json(MessageResp {
        message: "multipart upload aborted".into(),
    }))
}
