use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use core_config::{ConfigError, FromEnv, env_parse};

use crate::error::{UserError, UserResult};

/// One-way credential encoding used for username/password identities
#[cfg_attr(test, mockall::automock)]
pub trait PasswordEncoder: Send + Sync {
    /// Hash `password` into a self-describing credential string
    fn encode(&self, password: &str) -> UserResult<String>;

    /// Whether `password` matches `credential`. A malformed credential never matches.
    fn verify(&self, password: &str, credential: &str) -> bool;
}

/// Argon2id cost parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Environment variables:
/// - `PASSWORD_HASH_MEMORY_KIB` (default 19456)
/// - `PASSWORD_HASH_ITERATIONS` (default 2)
/// - `PASSWORD_HASH_PARALLELISM` (default 1)
impl FromEnv for PasswordConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            memory_kib: env_parse("PASSWORD_HASH_MEMORY_KIB", &defaults.memory_kib.to_string())?,
            iterations: env_parse("PASSWORD_HASH_ITERATIONS", &defaults.iterations.to_string())?,
            parallelism: env_parse(
                "PASSWORD_HASH_PARALLELISM",
                &defaults.parallelism.to_string(),
            )?,
        })
    }
}

#[derive(Clone)]
pub struct Argon2PasswordEncoder {
    argon2: Argon2<'static>,
}

impl Argon2PasswordEncoder {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    pub fn from_config(config: &PasswordConfig) -> UserResult<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| UserError::PasswordHash(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2PasswordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, password: &str) -> UserResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| UserError::PasswordHash(e.to_string()))
    }

    fn verify(&self, password: &str, credential: &str) -> bool {
        match PasswordHash::new(credential) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored credential is not a valid PHC string");
                false
            }
        }
    }
}
