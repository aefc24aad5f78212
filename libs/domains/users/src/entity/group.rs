use sea_orm::entity::prelude::*;

use crate::models::{Group, GroupLevel};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub info: Option<String>,
    pub level: GroupLevel,
    pub delete_time: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeleteTime.is_null())
}

impl From<Model> for Group {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            info: model.info,
            level: model.level,
        }
    }
}
