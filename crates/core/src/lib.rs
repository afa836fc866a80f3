//! Domain logic for the form workflow engine.
//!
//! Everything in this crate is storage-agnostic: services are generic over
//! the store traits in [`store`], with Postgres implementations living in
//! `formflow-db` and an in-memory implementation in [`memory`].

pub mod capability;
pub mod composer;
pub mod context;
pub mod error;
pub mod field;
pub mod mapping;
pub mod memory;
pub mod query;
pub mod registry;
pub mod response;
pub mod roles;
pub mod store;
pub mod types;
pub mod workflow;
