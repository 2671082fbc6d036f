//! Service layer: all business rules live here, behind the HTTP handlers.
//!
//! Each service holds the shared SQLite pool and the blob store. The
//! transaction discipline is uniform: metadata changes and the quota
//! mutation they cause always commit together, and no database
//! transaction is held open across a blob store call, with one
//! exception documented in `multipart_service::initiate`.

pub mod file_service;
pub mod multipart_service;
pub mod quota;
pub mod vault_service;
