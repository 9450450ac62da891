use sea_orm::entity::prelude::*;

use crate::models::Film;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "films")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: String,
    pub release_year: i32,
    pub rating: f32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Film {
    fn from(row: Model) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            release_year: row.release_year,
            rating: row.rating,
        }
    }
}
