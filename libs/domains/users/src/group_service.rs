use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, QueryFilter, QueryOrder};

use crate::entity::{group, user_group};
use crate::error::{UserError, UserResult};
use crate::models::{Group, GroupLevel};

/// Group lookups the user workflows depend on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupService: Send + Sync {
    /// The group carrying `level`
    async fn group_by_level(&self, level: GroupLevel) -> UserResult<Group>;

    /// Fails unless every id names a live group
    async fn groups_exist(&self, ids: &[i32]) -> UserResult<()>;

    /// Fails if any id names a group users may not be assigned to
    async fn groups_valid(&self, ids: &[i32]) -> UserResult<()>;

    /// Live groups the user is a member of, by group id
    async fn user_groups_by_user_id(&self, user_id: i32) -> UserResult<Vec<Group>>;
}

/// [`GroupService`] backed by the `groups` and `user_groups` tables
#[derive(Clone)]
pub struct DbGroupService {
    db: DatabaseConnection,
}

impl DbGroupService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn live_groups(&self, ids: &[i32]) -> UserResult<Vec<group::Model>> {
        let groups = group::live()
            .filter(group::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?;
        Ok(groups)
    }
}

#[async_trait]
impl GroupService for DbGroupService {
    async fn group_by_level(&self, level: GroupLevel) -> UserResult<Group> {
        group::live()
            .filter(group::Column::Level.eq(level))
            .order_by_asc(group::Column::Id)
            .one(&self.db)
            .await?
            .map(Group::from)
            .ok_or(UserError::GroupNotFound(level))
    }

    async fn groups_exist(&self, ids: &[i32]) -> UserResult<()> {
        let found = self.live_groups(ids).await?;

        let mut missing: Vec<i32> = ids
            .iter()
            .copied()
            .filter(|id| !found.iter().any(|g| g.id == *id))
            .collect();
        missing.sort_unstable();
        missing.dedup();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(UserError::InvalidGroupSelection(format!(
                "groups {missing:?} do not exist"
            )))
        }
    }

    async fn groups_valid(&self, ids: &[i32]) -> UserResult<()> {
        let protected: Vec<i32> = self
            .live_groups(ids)
            .await?
            .into_iter()
            .filter(|g| g.level == GroupLevel::Root)
            .map(|g| g.id)
            .collect();

        if protected.is_empty() {
            Ok(())
        } else {
            Err(UserError::InvalidGroupSelection(format!(
                "groups {protected:?} cannot be assigned"
            )))
        }
    }

    async fn user_groups_by_user_id(&self, user_id: i32) -> UserResult<Vec<Group>> {
        let group_ids: Vec<i32> = user_group::live()
            .filter(user_group::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|membership| membership.group_id)
            .collect();

        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let groups = group::live()
            .filter(group::Column::Id.is_in(group_ids))
            .order_by_asc(group::Column::Id)
            .all(&self.db)
            .await?;

        Ok(groups.into_iter().map(Group::from).collect())
    }
}
