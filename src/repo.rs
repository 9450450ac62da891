use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Expr,
};

use crate::{
    entities::{actor, film},
    error::{AppError, AppResult},
    models::{Actor, ActorFields, Film, FilmInput},
};

/// Authoritative storage for films.
///
/// `delete` and `update` report [`AppError::NotFound`] when no row matched the id.
#[async_trait]
pub trait FilmRepository: Send + Sync {
    async fn create(&self, input: &FilmInput) -> AppResult<Film>;
    async fn delete(&self, id: i32) -> AppResult<()>;
    async fn find(&self, id: i32) -> AppResult<Film>;
    async fn find_all(&self) -> AppResult<Vec<Film>>;
    async fn update(&self, id: i32, input: &FilmInput) -> AppResult<()>;
}

#[derive(Clone)]
pub struct SqlFilmRepository {
    db: DatabaseConnection,
}

impl SqlFilmRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FilmRepository for SqlFilmRepository {
    async fn create(&self, input: &FilmInput) -> AppResult<Film> {
        let model = film::ActiveModel {
            id: Default::default(),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            release_year: Set(input.release_year),
            rating: Set(input.rating),
        };

        let row = model.insert(&self.db).await?;
        Ok(row.into())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let res = film::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound("film", id));
        }
        Ok(())
    }

    async fn find(&self, id: i32) -> AppResult<Film> {
        film::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Film::from)
            .ok_or(AppError::NotFound("film", id))
    }

    async fn find_all(&self) -> AppResult<Vec<Film>> {
        let rows = film::Entity::find().order_by_asc(film::Column::Id).all(&self.db).await?;
        Ok(rows.into_iter().map(Film::from).collect())
    }

    async fn update(&self, id: i32, input: &FilmInput) -> AppResult<()> {
        let res = film::Entity::update_many()
            .col_expr(film::Column::Title, Expr::value(input.title.clone()))
            .col_expr(film::Column::Description, Expr::value(input.description.clone()))
            .col_expr(film::Column::ReleaseYear, Expr::value(input.release_year))
            .col_expr(film::Column::Rating, Expr::value(input.rating))
            .filter(film::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if res.rows_affected == 0 {
            return Err(AppError::NotFound("film", id));
        }
        Ok(())
    }
}

/// Storage for actors. Same not-found contract as [`FilmRepository`].
#[async_trait]
pub trait ActorRepository: Send + Sync {
    async fn create(&self, fields: &ActorFields) -> AppResult<Actor>;
    async fn delete(&self, id: i32) -> AppResult<()>;
    async fn find(&self, id: i32) -> AppResult<Actor>;
    async fn find_all(&self) -> AppResult<Vec<Actor>>;
    async fn update(&self, id: i32, fields: &ActorFields) -> AppResult<()>;
}

#[derive(Clone)]
pub struct SqlActorRepository {
    db: DatabaseConnection,
}

impl SqlActorRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActorRepository for SqlActorRepository {
    async fn create(&self, fields: &ActorFields) -> AppResult<Actor> {
        let model = actor::ActiveModel {
            id: Default::default(),
            name: Set(fields.name.clone()),
            gender: Set(fields.gender.as_code().to_string()),
            birth_date: Set(fields.birth_date.to_string()),
        };

        let row = model.insert(&self.db).await?;
        Ok(Actor::try_from(row)?)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let res = actor::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound("actor", id));
        }
        Ok(())
    }

    async fn find(&self, id: i32) -> AppResult<Actor> {
        let row = actor::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound("actor", id))?;
        Ok(Actor::try_from(row)?)
    }

    async fn find_all(&self) -> AppResult<Vec<Actor>> {
        let rows = actor::Entity::find().order_by_asc(actor::Column::Id).all(&self.db).await?;
        let actors = rows.into_iter().map(Actor::try_from).collect::<Result<Vec<_>, _>>()?;
        Ok(actors)
    }

    async fn update(&self, id: i32, fields: &ActorFields) -> AppResult<()> {
        let res = actor::Entity::update_many()
            .col_expr(actor::Column::Name, Expr::value(fields.name.clone()))
            .col_expr(actor::Column::Gender, Expr::value(fields.gender.as_code()))
            .col_expr(actor::Column::BirthDate, Expr::value(fields.birth_date.to_string()))
            .filter(actor::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if res.rows_affected == 0 {
            return Err(AppError::NotFound("actor", id));
        }
        Ok(())
    }
}
