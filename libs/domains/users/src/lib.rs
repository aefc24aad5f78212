//! Users Domain
//!
//! Account management for the CMS: registration, credential checks, group
//! membership and soft deletion.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   UserService   │  ← Workflows, transactions, root-user rules
//! └───┬─────────┬───┘
//!     │         │
//! ┌───▼───┐ ┌───▼────────────┐
//! │ Group │ │ PasswordEncoder│  ← Collaborators (traits + default impls)
//! │Service│ └────────────────┘
//! └───┬───┘
//!     │
//! ┌───▼─────────────┐
//! │  SeaORM entity  │  ← users, user_identities, groups, user_groups
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_users::{Argon2PasswordEncoder, DbGroupService, RegisterUser, UserService};
//!
//! # async fn run(db: sea_orm::DatabaseConnection) -> domain_users::UserResult<()> {
//! let service = UserService::new(
//!     db.clone(),
//!     DbGroupService::new(db),
//!     Argon2PasswordEncoder::new(),
//! );
//!
//! let alice = service.create_user(RegisterUser::new("alice", "pw1234")).await?;
//! service.verify_user("alice", "pw1234").await?;
//! # let _ = alice;
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod group_service;
pub mod models;
pub mod password;
pub mod service;

// Re-export commonly used types
pub use error::{ErrorKind, UserError, UserResult};
pub use group_service::{DbGroupService, GroupService};
pub use models::{Group, GroupLevel, IdentityType, Page, RegisterUser, User, UserWithGroups};
pub use password::{Argon2PasswordEncoder, PasswordConfig, PasswordEncoder};
pub use service::UserService;
