use jiff::civil::Date;
use sea_orm::entity::prelude::*;

use crate::models::{Actor, Gender};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "actors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub gender: String,
    /// `YYYY-MM-DD`
    pub birth_date: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Actor {
    type Error = DbErr;

    fn try_from(row: Model) -> Result<Self, DbErr> {
        let gender = Gender::from_code(&row.gender)
            .ok_or_else(|| DbErr::Type(format!("actor {}: bad gender {:?}", row.id, row.gender)))?;
        let birth_date = row.birth_date.parse::<Date>().map_err(|err| {
            DbErr::Type(format!("actor {}: bad birth_date {:?}: {err}", row.id, row.birth_date))
        })?;

        Ok(Self { id: row.id, name: row.name, gender, birth_date })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(gender: &str, birth_date: &str) -> Model {
        Model {
            id: 5,
            name: "Laurence Fishburne".to_string(),
            gender: gender.to_string(),
            birth_date: birth_date.to_string(),
        }
    }

    #[test]
    fn corrupt_rows_are_type_errors() {
        let actor = Actor::try_from(row("M", "1961-07-30")).unwrap();
        assert_eq!(actor.birth_date, jiff::civil::date(1961, 7, 30));

        assert!(matches!(Actor::try_from(row("?", "1961-07-30")), Err(DbErr::Type(_))));
        assert!(matches!(Actor::try_from(row("M", "yesterday")), Err(DbErr::Type(_))));
    }
}
