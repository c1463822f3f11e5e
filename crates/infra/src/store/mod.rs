//! Account and refresh-token storage.

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryAccountStore, InMemoryRefreshTokenStore};
pub use postgres::{PostgresAccountStore, PostgresRefreshTokenStore, apply_schema};
