//! Business logic behind the HTTP handlers. Each function owns its
//! transaction and returns domain values or an [`AppError`](crate::error::AppError).

pub mod auth;
pub mod cookies;
pub mod documents;
pub mod oauth;
pub mod teams;
