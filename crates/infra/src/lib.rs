//! Infrastructure layer: account/refresh-token stores and configuration.

pub mod config;
pub mod store;


pub use config::{AppConfig, ConfigError, Environment};
pub use store::{InMemoryAccountStore, InMemoryRefreshTokenStore, PostgresAccountStore, PostgresRefreshTokenStore};
