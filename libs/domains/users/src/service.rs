use std::collections::HashSet;
use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::instrument;

use crate::entity::{user, user_group, user_identity};
use crate::error::{UserError, UserResult};
use crate::group_service::GroupService;
use crate::models::{Group, GroupLevel, IdentityType, Page, RegisterUser, User, UserWithGroups};
use crate::password::PasswordEncoder;

/// Account management over the relational store.
///
/// Group policy comes from `G` and credential hashing from `P`; both are
/// shared so the service can be handed to several callers.
pub struct UserService<G: GroupService, P: PasswordEncoder> {
    db: DatabaseConnection,
    groups: Arc<G>,
    encoder: Arc<P>,
}

impl<G: GroupService, P: PasswordEncoder> UserService<G, P> {
    pub fn new(db: DatabaseConnection, groups: G, encoder: P) -> Self {
        Self {
            db,
            groups: Arc::new(groups),
            encoder: Arc::new(encoder),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_id(&self, id: i32) -> UserResult<User> {
        user::live()
            .filter(user::Column::Id.eq(id))
            .one(&self.db)
            .await?
            .map(User::from)
            .ok_or_else(|| UserError::UserNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_username(&self, username: &str) -> UserResult<User> {
        user::live()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .map(User::from)
            .ok_or_else(|| UserError::UserNotFound(username.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> UserResult<User> {
        user::live()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .map(User::from)
            .ok_or_else(|| UserError::UserNotFound(email.to_string()))
    }

    /// Id of the user linked to the root group, or 0 when it cannot be
    /// resolved. 0 means "unknown", never a real user.
    pub async fn get_root_user_id(&self) -> i32 {
        match self.resolve_root_user_id().await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::debug!("No user is linked to the root group");
                0
            }
            Err(e) => {
                tracing::warn!(error = %e, "Root user lookup failed, reporting 0");
                0
            }
        }
    }

    async fn resolve_root_user_id(&self) -> UserResult<Option<i32>> {
        let root = self.groups.group_by_level(GroupLevel::Root).await?;

        let membership = user_group::live()
            .filter(user_group::Column::GroupId.eq(root.id))
            .order_by_asc(user_group::Column::Id)
            .one(&self.db)
            .await?;

        Ok(membership.map(|m| m.user_id))
    }

    /// Users of `group_id` (0 for every group), root excluded, ordered by id.
    ///
    /// `page` is zero-based. A user whose groups cannot be loaded is still
    /// listed, with no groups.
    #[instrument(skip(self))]
    pub async fn get_user_page_by_group_id(
        &self,
        group_id: i32,
        page: u64,
        count: u64,
    ) -> UserResult<Page<UserWithGroups>> {
        let root_id = self.get_root_user_id().await;

        let mut memberships = user_group::live().filter(user_group::Column::UserId.ne(root_id));
        if group_id != 0 {
            memberships = memberships.filter(user_group::Column::GroupId.eq(group_id));
        }
        let memberships = memberships
            .order_by_asc(user_group::Column::Id)
            .all(&self.db)
            .await?;

        let candidates = distinct_user_ids(&memberships);
        if candidates.is_empty() {
            return Ok(Page::empty(page, count));
        }

        let users = user::live()
            .filter(user::Column::Id.is_in(candidates))
            .order_by_asc(user::Column::Id)
            .limit(count)
            .offset(page.saturating_mul(count))
            .all(&self.db)
            .await?;

        let mut items = Vec::with_capacity(users.len());
        for row in users {
            let user = User::from(row);
            let groups = self.groups_or_empty(user.id).await;
            items.push(UserWithGroups::new(user, groups));
        }

        Ok(Page::new(page, count, items))
    }

    async fn groups_or_empty(&self, user_id: i32) -> Vec<Group> {
        match self.groups.user_groups_by_user_id(user_id).await {
            Ok(groups) => groups,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Listing user without its groups");
                Vec::new()
            }
        }
    }

    /// Whether user `id` is a member of the root group
    #[instrument(skip(self))]
    pub async fn is_admin(&self, id: i32) -> UserResult<bool> {
        let user = self.get_user_by_id(id).await?;
        let root = self.groups.group_by_level(GroupLevel::Root).await?;

        let membership = user_group::live()
            .filter(user_group::Column::UserId.eq(user.id))
            .filter(user_group::Column::GroupId.eq(root.id))
            .one(&self.db)
            .await?;

        Ok(membership.is_some())
    }

    /// Check a username/password pair and return the matching user
    #[instrument(skip(self, password))]
    pub async fn verify_user(&self, username: &str, password: &str) -> UserResult<User> {
        let identity = user_identity::live_of_type(IdentityType::UsernamePassword)
            .filter(user_identity::Column::Identifier.eq(username))
            .order_by_asc(user_identity::Column::Id)
            .one(&self.db)
            .await?
            .ok_or(UserError::IdentityNotFound)?;

        if !self.encoder.verify(password, &identity.credential) {
            return Err(UserError::InvalidCredential);
        }

        let user = self.get_user_by_username(username).await.map_err(|e| {
            tracing::warn!(error = %e, "Credential matched but the user could not be loaded");
            UserError::IdentityNotFound
        })?;

        // The login name must belong to the account that owns the credential
        if user.id != identity.user_id {
            tracing::warn!(
                user_id = user.id,
                identity_user_id = identity.user_id,
                "Identity belongs to a different user"
            );
            return Err(UserError::IdentityNotFound);
        }

        Ok(user)
    }

    /// Replace the password of user `id`
    #[instrument(skip(self, new_password))]
    pub async fn change_user_password(&self, id: i32, new_password: &str) -> UserResult<()> {
        let user = self.get_user_by_id(id).await?;

        let identity = user_identity::live_of_type(IdentityType::UsernamePassword)
            .filter(user_identity::Column::UserId.eq(user.id))
            .one(&self.db)
            .await?
            .ok_or(UserError::IdentityNotFound)?;

        let credential = self.encoder.encode(new_password)?;

        let mut active: user_identity::ActiveModel = identity.into();
        active.credential = Set(credential);
        active.update_time = Set(chrono::Utc::now().into());
        active.update(&self.db).await?;

        tracing::info!(user_id = id, "Password changed");
        Ok(())
    }

    /// Soft-delete user `id` along with its identities and memberships
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i32) -> UserResult<()> {
        let user = self.get_user_by_id(id).await?;

        if self.get_root_user_id().await == user.id {
            return Err(UserError::RootUserProtected);
        }

        let txn = self.db.begin().await?;
        let outcome = soft_delete_within(&txn, user.id).await;
        finish(txn, outcome).await?;

        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Register a new account.
    ///
    /// Username and email collisions are reported as such. Everything after
    /// those checks runs in one transaction, and any failure there surfaces
    /// as [`UserError::TransactionFailed`] with nothing persisted.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_user(&self, input: RegisterUser) -> UserResult<User> {
        if self.username_taken(&input.username).await? {
            return Err(UserError::UsernameTaken(input.username));
        }

        if let Some(email) = input.email() {
            let taken = user::live()
                .filter(user::Column::Email.eq(email))
                .one(&self.db)
                .await?
                .is_some();
            if taken {
                return Err(UserError::EmailTaken(email.to_string()));
            }
        }

        let txn = self.db.begin().await.map_err(|e| {
            tracing::warn!(error = %e, "Could not open registration transaction");
            UserError::TransactionFailed
        })?;

        let outcome = self.register_within(&txn, &input).await;
        let user = finish(txn, outcome).await.map_err(|e| {
            tracing::warn!(error = %e, "Registration rolled back");
            UserError::TransactionFailed
        })?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    async fn register_within(
        &self,
        txn: &DatabaseTransaction,
        input: &RegisterUser,
    ) -> UserResult<User> {
        // Group reads go through the service's own connection, so they must
        // happen before this transaction writes anything.
        let group_ids = if input.group_ids.is_empty() {
            vec![self.groups.group_by_level(GroupLevel::Guest).await?.id]
        } else {
            let ids = distinct_ids(&input.group_ids);
            self.groups.groups_exist(&ids).await?;
            self.groups.groups_valid(&ids).await?;
            ids
        };

        let created = user::ActiveModel::from(input).insert(txn).await?;

        user_group::Entity::insert_many(
            group_ids
                .iter()
                .map(|group_id| user_group::new_row(created.id, *group_id)),
        )
        .exec(txn)
        .await?;

        self.insert_identity(txn, created.id, &input.username, &input.password)
            .await?;

        Ok(created.into())
    }

    /// Store a username/password identity for an existing user.
    ///
    /// Fails with [`UserError::UsernameTaken`] when a live identity already
    /// uses `username` as its login name.
    #[instrument(skip(self, password))]
    pub async fn create_username_password_identity(
        &self,
        user_id: i32,
        username: &str,
        password: &str,
    ) -> UserResult<()> {
        if self.identifier_taken(username).await? {
            return Err(UserError::UsernameTaken(username.to_string()));
        }

        self.insert_identity(&self.db, user_id, username, password)
            .await
    }

    async fn insert_identity<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i32,
        username: &str,
        password: &str,
    ) -> UserResult<()> {
        let credential = self.encoder.encode(password)?;
        user_identity::new_password_row(user_id, username, credential)
            .insert(conn)
            .await?;
        Ok(())
    }

    /// Create the root account unless one already exists; returns its id.
    ///
    /// This is the only way a user joins the root group.
    #[instrument(skip(self, password))]
    pub async fn ensure_root_user(&self, username: &str, password: &str) -> UserResult<i32> {
        if let Some(id) = self.resolve_root_user_id().await? {
            tracing::debug!(user_id = id, "Root user already present");
            return Ok(id);
        }

        if self.username_taken(username).await? {
            return Err(UserError::UsernameTaken(username.to_string()));
        }

        let root = self.groups.group_by_level(GroupLevel::Root).await?;

        let txn = self.db.begin().await?;
        let outcome = async {
            let created = user::new_row(username, None).insert(&txn).await?;
            user_group::new_row(created.id, root.id).insert(&txn).await?;
            self.insert_identity(&txn, created.id, username, password)
                .await?;
            Ok::<_, UserError>(created.id)
        }
        .await;
        let id = finish(txn, outcome).await?;

        tracing::info!(user_id = id, "Root user created");
        Ok(id)
    }

    /// A name is taken when a live user has it or a live identity logs in with it
    async fn username_taken(&self, username: &str) -> UserResult<bool> {
        let existing = user::live()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Ok(true);
        }

        self.identifier_taken(username).await
    }

    async fn identifier_taken(&self, identifier: &str) -> UserResult<bool> {
        let existing = user_identity::live_of_type(IdentityType::UsernamePassword)
            .filter(user_identity::Column::Identifier.eq(identifier))
            .one(&self.db)
            .await?;
        Ok(existing.is_some())
    }
}

/// Commit on success, roll back on failure
async fn finish<T>(txn: DatabaseTransaction, outcome: UserResult<T>) -> UserResult<T> {
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                tracing::error!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn soft_delete_within(txn: &DatabaseTransaction, user_id: i32) -> UserResult<()> {
    let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();

    user::Entity::update_many()
        .col_expr(user::Column::DeleteTime, Expr::value(now))
        .col_expr(user::Column::UpdateTime, Expr::value(now))
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::DeleteTime.is_null())
        .exec(txn)
        .await?;

    user_identity::Entity::update_many()
        .col_expr(user_identity::Column::DeleteTime, Expr::value(now))
        .filter(user_identity::Column::UserId.eq(user_id))
        .filter(user_identity::Column::DeleteTime.is_null())
        .exec(txn)
        .await?;

    user_group::Entity::update_many()
        .col_expr(user_group::Column::DeleteTime, Expr::value(now))
        .filter(user_group::Column::UserId.eq(user_id))
        .filter(user_group::Column::DeleteTime.is_null())
        .exec(txn)
        .await?;

    Ok(())
}

/// `ids` without repeats, first occurrence wins
fn distinct_ids(ids: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn distinct_user_ids(memberships: &[user_group::Model]) -> Vec<i32> {
    let ids: Vec<i32> = memberships.iter().map(|m| m.user_id).collect();
    distinct_ids(&ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group_service::MockGroupService;
    use crate::password::MockPasswordEncoder;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn group(id: i32, name: &str, level: GroupLevel) -> Group {
        Group {
            id,
            name: name.to_string(),
            info: None,
            level,
        }
    }

    fn user_row(id: i32, username: &str) -> user::Model {
        let now = chrono::Utc::now().into();
        user::Model {
            id,
            username: username.to_string(),
            email: None,
            create_time: now,
            update_time: now,
            delete_time: None,
        }
    }

    fn membership(id: i32, user_id: i32, group_id: i32) -> user_group::Model {
        user_group::Model {
            id,
            user_id,
            group_id,
            delete_time: None,
        }
    }

    fn identity_row(user_id: i32, username: &str, credential: &str) -> user_identity::Model {
        let now = chrono::Utc::now().into();
        user_identity::Model {
            id: 1,
            user_id,
            identity_type: IdentityType::UsernamePassword.to_string(),
            identifier: username.to_string(),
            credential: credential.to_string(),
            create_time: now,
            update_time: now,
            delete_time: None,
        }
    }

    fn root_group_missing() -> MockGroupService {
        let mut groups = MockGroupService::new();
        groups
            .expect_group_by_level()
            .returning(|level| Err(UserError::GroupNotFound(level)));
        groups
    }

    fn root_group_at(id: i32) -> MockGroupService {
        let mut groups = MockGroupService::new();
        groups
            .expect_group_by_level()
            .withf(|level| *level == GroupLevel::Root)
            .returning(move |_| Ok(group(id, "root", GroupLevel::Root)));
        groups
    }

    #[test]
    fn test_distinct_user_ids_keeps_first_occurrence() {
        let rows = vec![
            membership(1, 4, 2),
            membership(2, 3, 2),
            membership(3, 4, 5),
            membership(4, 9, 5),
        ];
        assert_eq!(distinct_user_ids(&rows), vec![4, 3, 9]);
        assert!(distinct_user_ids(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_root_user_id_is_zero_without_root_group() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = UserService::new(db, root_group_missing(), MockPasswordEncoder::new());

        assert_eq!(service.get_root_user_id().await, 0);
    }

    #[tokio::test]
    async fn test_root_user_id_is_zero_without_member() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user_group::Model>::new()])
            .into_connection();
        let service = UserService::new(db, root_group_at(1), MockPasswordEncoder::new());

        assert_eq!(service.get_root_user_id().await, 0);
    }

    #[tokio::test]
    async fn test_root_user_id_resolves_member() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![membership(10, 7, 1)]])
            .into_connection();
        let service = UserService::new(db, root_group_at(1), MockPasswordEncoder::new());

        assert_eq!(service.get_root_user_id().await, 7);
    }

    #[tokio::test]
    async fn test_get_user_by_id_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let service = UserService::new(db, MockGroupService::new(), MockPasswordEncoder::new());

        let result = service.get_user_by_id(42).await;

        assert!(matches!(result, Err(UserError::UserNotFound(id)) if id == "42"));
    }

    #[tokio::test]
    async fn test_page_without_candidates_is_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user_group::Model>::new()])
            .into_connection();
        let service = UserService::new(db, root_group_missing(), MockPasswordEncoder::new());

        let page = service.get_user_page_by_group_id(3, 0, 10).await.unwrap();

        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_page_lists_user_whose_groups_fail_to_load() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                membership(1, 2, 2),
                membership(2, 2, 3),
                membership(3, 3, 2),
            ]])
            .append_query_results([vec![user_row(2, "alice"), user_row(3, "bob")]])
            .into_connection();

        let mut groups = root_group_missing();
        groups
            .expect_user_groups_by_user_id()
            .withf(|id| *id == 2)
            .returning(|_| Ok(vec![group(2, "guest", GroupLevel::Guest)]));
        groups
            .expect_user_groups_by_user_id()
            .withf(|id| *id == 3)
            .returning(|_| Err(UserError::Store(sea_orm::DbErr::Custom("gone".into()))));

        let service = UserService::new(db, groups, MockPasswordEncoder::new());
        let page = service.get_user_page_by_group_id(0, 0, 10).await.unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].username, "alice");
        assert_eq!(page.items[0].groups.len(), 1);
        assert_eq!(page.items[1].username, "bob");
        assert!(page.items[1].groups.is_empty());
    }

    #[tokio::test]
    async fn test_is_admin_false_without_root_membership() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user_row(5, "alice")]])
            .append_query_results([Vec::<user_group::Model>::new()])
            .into_connection();
        let service = UserService::new(db, root_group_at(1), MockPasswordEncoder::new());

        assert!(!service.is_admin(5).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_admin_propagates_missing_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let service = UserService::new(db, MockGroupService::new(), MockPasswordEncoder::new());

        assert!(matches!(
            service.is_admin(5).await,
            Err(UserError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_user_without_identity() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user_identity::Model>::new()])
            .into_connection();
        let service = UserService::new(db, MockGroupService::new(), MockPasswordEncoder::new());

        let result = service.verify_user("alice", "pw123").await;

        assert!(matches!(result, Err(UserError::IdentityNotFound)));
    }

    #[tokio::test]
    async fn test_verify_user_wrong_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![identity_row(2, "alice", "$argon2id$stored")]])
            .into_connection();
        let mut encoder = MockPasswordEncoder::new();
        encoder
            .expect_verify()
            .withf(|password, credential| password == "nope" && credential == "$argon2id$stored")
            .returning(|_, _| false);
        let service = UserService::new(db, MockGroupService::new(), encoder);

        let result = service.verify_user("alice", "nope").await;

        assert!(matches!(result, Err(UserError::InvalidCredential)));
    }

    #[tokio::test]
    async fn test_verify_user_missing_user_reads_as_missing_identity() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![identity_row(2, "alice", "$argon2id$stored")]])
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let mut encoder = MockPasswordEncoder::new();
        encoder.expect_verify().returning(|_, _| true);
        let service = UserService::new(db, MockGroupService::new(), encoder);

        let result = service.verify_user("alice", "pw123").await;

        assert!(matches!(result, Err(UserError::IdentityNotFound)));
    }

    #[tokio::test]
    async fn test_verify_user_success() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![identity_row(2, "alice", "$argon2id$stored")]])
            .append_query_results([vec![user_row(2, "alice")]])
            .into_connection();
        let mut encoder = MockPasswordEncoder::new();
        encoder.expect_verify().returning(|_, _| true);
        let service = UserService::new(db, MockGroupService::new(), encoder);

        let user = service.verify_user("alice", "pw123").await.unwrap();

        assert_eq!(user.id, 2);
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_verify_user_rejects_identity_of_another_user() {
        // Login name "bob" is held by user 2, while the user named bob is 5
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![identity_row(2, "bob", "$argon2id$stored")]])
            .append_query_results([vec![user_row(5, "bob")]])
            .into_connection();
        let mut encoder = MockPasswordEncoder::new();
        encoder.expect_verify().returning(|_, _| true);
        let service = UserService::new(db, MockGroupService::new(), encoder);

        let result = service.verify_user("bob", "alice-secret").await;

        assert!(matches!(result, Err(UserError::IdentityNotFound)));
    }

    #[tokio::test]
    async fn test_identity_rejects_taken_identifier() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![identity_row(2, "bob", "$argon2id$stored")]])
            .into_connection();
        // No encode expectation: hashing before the check would panic
        let service = UserService::new(db, MockGroupService::new(), MockPasswordEncoder::new());

        let result = service
            .create_username_password_identity(7, "bob", "pw1234")
            .await;

        assert!(matches!(result, Err(UserError::UsernameTaken(name)) if name == "bob"));
    }

    #[tokio::test]
    async fn test_create_user_rejects_name_used_as_login() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([vec![identity_row(2, "bob", "$argon2id$stored")]])
            .into_connection();
        let service = UserService::new(db, MockGroupService::new(), MockPasswordEncoder::new());

        let result = service.create_user(RegisterUser::new("bob", "bobpw12")).await;

        assert!(matches!(result, Err(UserError::UsernameTaken(_))));
    }

    #[tokio::test]
    async fn test_change_password_of_missing_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let service = UserService::new(db, MockGroupService::new(), MockPasswordEncoder::new());

        let result = service.change_user_password(9, "newpass").await;

        assert!(matches!(result, Err(UserError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_change_password_stores_encoded_credential() {
        let updated = identity_row(2, "alice", "encoded:newpass");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user_row(2, "alice")]])
            .append_query_results([vec![identity_row(2, "alice", "encoded:old")]])
            .append_query_results([vec![updated]])
            .into_connection();
        let mut encoder = MockPasswordEncoder::new();
        encoder
            .expect_encode()
            .times(1)
            .returning(|password| Ok(format!("encoded:{password}")));
        let service = UserService::new(db, MockGroupService::new(), encoder);

        service.change_user_password(2, "newpass").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_root_user_is_refused() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user_row(1, "admin")]])
            .append_query_results([vec![membership(1, 1, 1)]])
            .into_connection();
        let service = UserService::new(db, root_group_at(1), MockPasswordEncoder::new());

        let result = service.delete_user(1).await;

        assert!(matches!(result, Err(UserError::RootUserProtected)));
    }

    #[tokio::test]
    async fn test_delete_user_soft_deletes_three_tables() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user_row(4, "bob")]])
            .append_query_results([vec![membership(1, 1, 1)]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
            ])
            .into_connection();
        let service = UserService::new(db, root_group_at(1), MockPasswordEncoder::new());

        service.delete_user(4).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_user_without_root_group() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user_row(4, "bob")]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();
        let service = UserService::new(db, root_group_missing(), MockPasswordEncoder::new());

        service.delete_user(4).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_user_rejects_taken_username() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user_row(2, "alice")]])
            .into_connection();
        // Neither mock has expectations: any group or hashing call would panic.
        let service = UserService::new(db, MockGroupService::new(), MockPasswordEncoder::new());

        let result = service.create_user(RegisterUser::new("alice", "pw1234")).await;

        assert!(matches!(result, Err(UserError::UsernameTaken(name)) if name == "alice"));
    }

    #[tokio::test]
    async fn test_create_user_rejects_taken_email() {
        let mut other = user_row(3, "bob");
        other.email = Some("shared@example.com".to_string());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<user_identity::Model>::new()])
            .append_query_results([vec![other]])
            .into_connection();
        let service = UserService::new(db, MockGroupService::new(), MockPasswordEncoder::new());

        let input = RegisterUser::new("alice", "pw1234").with_email("shared@example.com");
        let result = service.create_user(input).await;

        assert!(matches!(result, Err(UserError::EmailTaken(_))));
    }

    #[tokio::test]
    async fn test_create_user_invalid_group_is_opaque() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<user_identity::Model>::new()])
            .into_connection();
        let mut groups = MockGroupService::new();
        groups
            .expect_groups_exist()
            .withf(|ids| ids.to_vec() == vec![7, 3])
            .returning(|_| Err(UserError::InvalidGroupSelection("groups [7] do not exist".into())));
        let service = UserService::new(db, groups, MockPasswordEncoder::new());

        let input = RegisterUser::new("alice", "pw1234").with_groups(vec![7, 3, 7]);
        let result = service.create_user(input).await;

        assert!(matches!(result, Err(UserError::TransactionFailed)));
    }

    #[tokio::test]
    async fn test_create_user_without_guest_group_is_opaque() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<user_identity::Model>::new()])
            .into_connection();
        let mut groups = MockGroupService::new();
        groups
            .expect_group_by_level()
            .withf(|level| *level == GroupLevel::Guest)
            .returning(|level| Err(UserError::GroupNotFound(level)));
        let service = UserService::new(db, groups, MockPasswordEncoder::new());

        let result = service.create_user(RegisterUser::new("alice", "pw1234")).await;

        assert!(matches!(result, Err(UserError::TransactionFailed)));
    }

    #[tokio::test]
    async fn test_ensure_root_user_keeps_existing_root() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![membership(1, 3, 1)]])
            .into_connection();
        let service = UserService::new(db, root_group_at(1), MockPasswordEncoder::new());

        assert_eq!(service.ensure_root_user("admin", "secret").await.unwrap(), 3);
    }
}
