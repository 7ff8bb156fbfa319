//! Infrastructure layer: Postgres-backed membership store and identity
//! directory.

pub mod postgres;

pub use postgres::{PostgresDirectory, PostgresMembershipStore};
