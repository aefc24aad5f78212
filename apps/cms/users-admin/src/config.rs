//! Configuration for the users admin CLI

use core_config::{Environment, FromEnv};
use database::postgres::PostgresConfig;
use domain_users::PasswordConfig;
use eyre::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub database: PostgresConfig,
    pub password: PasswordConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            environment: Environment::from_env(),
            database: <PostgresConfig as FromEnv>::from_env()?,
            password: <PasswordConfig as FromEnv>::from_env()?,
        })
    }
}
