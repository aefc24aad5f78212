//! SeaORM entities for the four account tables.
//!
//! Every table is soft-deleted through `delete_time`; each module exposes a
//! `live()` select that hides deleted rows and is the only way the service
//! reads them.

pub mod group;
pub mod user;
pub mod user_group;
pub mod user_identity;
