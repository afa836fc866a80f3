//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires `GLOBAL_ADMIN` or `LOCAL_ADMIN`.

pub mod auth;
pub mod rbac;
