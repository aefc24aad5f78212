use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

use crate::models::IdentityType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_identities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub identity_type: String,
    pub identifier: String,
    pub credential: String,
    pub create_time: DateTimeWithTimeZone,
    pub update_time: DateTimeWithTimeZone,
    pub delete_time: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeleteTime.is_null())
}

/// Live identities of one type
pub fn live_of_type(identity_type: IdentityType) -> Select<Entity> {
    live().filter(Column::IdentityType.eq(identity_type.as_ref()))
}

/// Insertable username/password identity; `credential` must already be encoded
pub fn new_password_row(user_id: i32, username: &str, credential: String) -> ActiveModel {
    let now: DateTimeWithTimeZone = chrono::Utc::now().into();
    ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        identity_type: Set(IdentityType::UsernamePassword.to_string()),
        identifier: Set(username.to_owned()),
        credential: Set(credential),
        create_time: Set(now),
        update_time: Set(now),
        delete_time: NotSet,
    }
}
