//! Defines routes for all vault, file, and multipart upload operations.
//!
//! ## Structure
//! - **Vault endpoints**
//!   - `POST   /vault/create` — create a vault (public)
//!   - `POST   /vault/login`  — owner login with password, guest without (public)
//!   - `GET    /vault`        — vault summary + files, filtered by role
//!   - `PATCH  /vault`        — rename / change password (owner)
//!   - `DELETE /vault`        — delete vault and contents (owner)
//!
//! - **File endpoints**
//!   - `POST   /file/upload`      — single-shot upload (owner)
//!   - `GET    /file/{id}`        — time-limited download URL
//!   - `PATCH  /file/{id}`        — rename / visibility (owner)
//!   - `DELETE /file/{id}`        — delete (owner)
//!   - `POST   /file/bulk-delete` — batch delete (owner)
//!
//! - **Multipart upload endpoints**
//!   - `POST   /file/multipart/initiate`       (owner)
//!   - `PUT    /file/multipart/{id}/chunk`     (owner)
//!   - `POST   /file/multipart/{id}/complete`  (owner)
//!   - `DELETE /file/multipart/{id}/abort`     (owner)

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

use crate::AppState;
use crate::handlers::{
    file_handlers::{bulk_delete, delete_file, download_file, update_file, upload_file},
    health_handlers::{healthz, readyz},
    multipart_handlers::{abort, complete, initiate, upload_chunk},
    vault_handlers::{create_vault, delete_vault, get_vault, login, update_vault},
};

/// Largest accepted request body. Individual multipart parts are capped
/// well below this by the part-size rules; the limit only guards against
/// unbounded bodies.
const MAX_BODY_BYTES: usize = 1024 * 1024 * 1024;

/// Build and return the router for all vault and file routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // vault endpoints
        .route("/vault/create", post(create_vault))
        .route("/vault/login", post(login))
        .route(
            "/vault",
            get(get_vault).patch(update_vault).delete(delete_vault),
        )
        // file endpoints
        .route("/file/upload", post(upload_file))
        .route("/file/bulk-delete", post(bulk_delete))
        .route(
            "/file/{id}",
            get(download_file).patch(update_file).delete(delete_file),
        )
        // multipart upload endpoints
        .route("/file/multipart/initiate", post(initiate))
        .route("/file/multipart/{id}/chunk", put(upload_chunk))
        .route("/file/multipart/{id}/complete", post(complete))
        .route("/file/multipart/{id}/abort", delete(abort))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
