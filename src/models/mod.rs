//! Core data models for the file vault service.
//!
//! These entities map to the SQLite tables via `sqlx::FromRow` and
//! serialize naturally as JSON via `serde`. The vault id is the hard
//! tenancy boundary: every query over files, uploads, and chunks filters
//! by the vault id taken from the caller's token.

pub mod file;
pub mod upload;
pub mod vault;
