//! PostgreSQL pool configuration, connection and migration helpers

mod config;
mod connector;
mod health;

pub use config::PostgresConfig;
pub use connector::{connect_from_config, connect_from_config_with_retry, run_migrations};
pub use health::check_health;

pub use sea_orm::DatabaseConnection;
pub use sea_orm_migration::MigratorTrait;
