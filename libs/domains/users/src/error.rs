use thiserror::Error;

use crate::models::GroupLevel;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Identity not found")]
    IdentityNotFound,

    #[error("No group with level '{0}'")]
    GroupNotFound(GroupLevel),

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Email '{0}' is already taken")]
    EmailTaken(String),

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Invalid group selection: {0}")]
    InvalidGroupSelection(String),

    #[error("The root user cannot be deleted")]
    RootUserProtected,

    #[error("Registration failed")]
    TransactionFailed,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Store error: {0}")]
    Store(#[from] sea_orm::DbErr),
}

pub type UserResult<T> = Result<T, UserError>;

/// Caller-facing classification of a [`UserError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidCredential,
    InvalidGroupSelection,
    RootUserProtected,
    TransactionFailed,
    StoreError,
}

impl UserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UserError::UserNotFound(_)
            | UserError::IdentityNotFound
            | UserError::GroupNotFound(_) => ErrorKind::NotFound,
            UserError::UsernameTaken(_) | UserError::EmailTaken(_) => ErrorKind::AlreadyExists,
            UserError::InvalidCredential => ErrorKind::InvalidCredential,
            UserError::InvalidGroupSelection(_) => ErrorKind::InvalidGroupSelection,
            UserError::RootUserProtected => ErrorKind::RootUserProtected,
            UserError::TransactionFailed => ErrorKind::TransactionFailed,
            UserError::PasswordHash(_) | UserError::Store(_) => ErrorKind::StoreError,
        }
    }
}
