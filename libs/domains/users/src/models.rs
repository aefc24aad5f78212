use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use validator::Validate;

/// Permission level of a group
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroupLevel {
    /// Administrative group; exactly one user belongs to it
    #[sea_orm(num_value = 1)]
    Root,
    /// Default group for registrants that ask for none
    #[sea_orm(num_value = 2)]
    Guest,
    #[sea_orm(num_value = 3)]
    User,
}

/// Tag stored in `user_identities.identity_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum IdentityType {
    #[strum(serialize = "USERNAME_PASSWORD")]
    UsernamePassword,
}

/// A live (non-deleted) user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i32,
    pub name: String,
    pub info: Option<String>,
    pub level: GroupLevel,
}

/// Listing entry: a user plus the groups it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserWithGroups {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub create_time: DateTime<Utc>,
    pub groups: Vec<Group>,
}

impl UserWithGroups {
    pub fn new(user: User, groups: Vec<Group>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            create_time: user.create_time,
            groups,
        }
    }
}

/// One page of a listing.
///
/// `total` is the number of items on this page, not the size of the whole
/// result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub page: u64,
    pub count: u64,
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(page: u64, count: u64, items: Vec<T>) -> Self {
        Self {
            page,
            count,
            total: items.len() as u64,
            items,
        }
    }

    pub fn empty(page: u64, count: u64) -> Self {
        Self::new(page, count, Vec::new())
    }
}

/// Registration payload.
///
/// Only `username` and `email` end up on the user row; the password goes to
/// the identity row and `group_ids` to the membership rows.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(length(min = 2, max = 24))]
    pub username: String,
    #[validate(length(min = 6, max = 64))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub confirm_password: String,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    #[serde(default)]
    pub group_ids: Vec<i32>,
}

impl RegisterUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            username: username.into(),
            confirm_password: password.clone(),
            password,
            email: None,
            group_ids: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_groups(mut self, group_ids: Vec<i32>) -> Self {
        self.group_ids = group_ids;
        self
    }

    /// The email to persist; blank counts as absent
    pub fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}
