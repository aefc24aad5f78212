//! Relational store plumbing for the CMS backend.
//!
//! Connection pooling, connect-with-retry, migration running and health
//! checks over SeaORM. Domain crates only ever see a
//! [`sea_orm::DatabaseConnection`]; everything about how it was opened
//! lives here.
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::postgres::{self, PostgresConfig};
//!
//! let config = PostgresConfig::from_env()?;
//! let db = postgres::connect_from_config_with_retry(config, None).await?;
//! postgres::run_migrations::<migration::Migrator>(&db, "users-admin").await?;
//! ```

pub mod common;
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult};
