pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_films;
mod m20240315_000001_create_actors;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_films::Migration),
            Box::new(m20240315_000001_create_actors::Migration),
        ]
    }
}
