//! `disclose-api` — trusted HTTP surface over the access-control core.
//!
//! Callers authenticate with the identity platform's Bearer token; the
//! elevated directory credentials used by member provisioning live only in
//! this process's wiring and are never derived from a caller's session.

pub mod app;
pub mod context;
pub mod middleware;
