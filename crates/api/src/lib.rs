//! `aegis-api` — HTTP surface for the identity/RBAC service.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
