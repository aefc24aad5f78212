use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub group_id: i32,
    pub delete_time: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeleteTime.is_null())
}

pub fn new_row(user_id: i32, group_id: i32) -> ActiveModel {
    ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        group_id: Set(group_id),
        delete_time: NotSet,
    }
}
