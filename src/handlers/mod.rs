//! HTTP handlers, grouped by route family.
//!
//! Handlers stay thin: decode the request, check the caller's role, call
//! one service method, shape the response. Request and response bodies
//! are defined next to the handlers that use them.

pub mod file_handlers;
pub mod health_handlers;
pub mod multipart_handlers;
pub mod vault_handlers;
