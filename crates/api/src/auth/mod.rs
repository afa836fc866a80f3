//! Authentication primitives.
//!
//! Sessions are issued elsewhere; this service only verifies bearer tokens.
//! - [`jwt`] -- HS256 access-token validation (and minting for tests and tooling).

pub mod jwt;
