use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Actors::Table)
                    .if_not_exists()
                    .col(pk_auto(Actors::Id))
                    .col(string_len(Actors::Name, 100))
                    .col(string_len(Actors::Gender, 1))
                    .col(string_len(Actors::BirthDate, 10))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_actors_name_birth_date")
                    .table(Actors::Table)
                    .col(Actors::Name)
                    .col(Actors::BirthDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Actors::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Actors {
    Table,
    Id,
    Name,
    Gender,
    BirthDate,
}
