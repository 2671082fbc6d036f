//! file-vault — multi-tenant password-protected file storage.
//!
//! Users create vaults, log in for a bearer token scoped to one vault and a
//! role (owner or guest), and manage files whose bytes live in a blob store
//! while metadata and storage quotas live in SQLite. Large files go through
//! a multipart upload flow that coordinates the blob backend's native
//! multipart protocol with the local metadata ledger.

pub mod auth;
pub mod blob;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::auth::TokenService;
use crate::blob::BlobStore;
use crate::services::file_service::FileService;
use crate::services::multipart_service::MultipartCoordinator;
use crate::services::vault_service::VaultService;

/// Shared application state handed to every handler through the router.
#[derive(Clone)]
pub struct AppState {
    pub vaults: VaultService,
    pub files: FileService,
    pub multipart: MultipartCoordinator,
    pub tokens: TokenService,
    pub db: Arc<SqlitePool>,
    pub blob: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(
        db: Arc<SqlitePool>,
        blob: Arc<dyn BlobStore>,
        tokens: TokenService,
        download_ttl: Duration,
    ) -> Self {
        Self {
            vaults: VaultService::new(db.clone(), blob.clone(), tokens.clone()),
            files: FileService::new(db.clone(), blob.clone(), download_ttl),
            multipart: MultipartCoordinator::new(db.clone(), blob.clone()),
            tokens,
            db,
            blob,
        }
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> TokenService {
        state.tokens.clone()
    }
}
