use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

use crate::models::{RegisterUser, User};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
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

/// Insertable row for `username`; id and delete marker are left to the store
pub fn new_row(username: &str, email: Option<&str>) -> ActiveModel {
    let now: DateTimeWithTimeZone = chrono::Utc::now().into();
    ActiveModel {
        id: NotSet,
        username: Set(username.to_owned()),
        email: Set(email.map(str::to_owned)),
        create_time: Set(now),
        update_time: Set(now),
        delete_time: NotSet,
    }
}

impl From<&RegisterUser> for ActiveModel {
    fn from(input: &RegisterUser) -> Self {
        new_row(&input.username, input.email())
    }
}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            create_time: model.create_time.into(),
            update_time: model.update_time.into(),
        }
    }
}
