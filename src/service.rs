use std::{num::NonZeroU32, sync::Arc};

use futures::{StreamExt, stream};
use governor::{Quota, RateLimiter};
use tracing::{debug, info, warn};

use crate::{
    error::AppResult,
    models::{Actor, ActorInput, Film, FilmInput, ReindexReport, SearchFilters},
    repo::{ActorRepository, FilmRepository},
    search::{FilmDocument, FilmSearchIndex, query::build_query},
};

/// Keeps the search index in step with the primary store.
///
/// Writes go to the primary store first and fail the call if it fails. The index is then
/// updated on a best-effort basis: its errors are logged and never change the result.
#[derive(Clone)]
pub struct FilmService {
    repo: Arc<dyn FilmRepository>,
    search: Arc<dyn FilmSearchIndex>,
    reindex_concurrency: usize,
    reindex_rps: u32,
}

impl FilmService {
    pub fn new(repo: Arc<dyn FilmRepository>, search: Arc<dyn FilmSearchIndex>) -> Self {
        Self { repo, search, reindex_concurrency: 8, reindex_rps: 50 }
    }

    pub fn with_reindex_limits(mut self, concurrency: usize, rps: u32) -> Self {
        self.reindex_concurrency = concurrency.max(1);
        self.reindex_rps = rps;
        self
    }

    pub async fn create(&self, input: FilmInput) -> AppResult<Film> {
        let input = input.validate()?;
        let film = self.repo.create(&input).await?;
        debug!(film_id = film.id, "created film");

        self.mirror(&film).await;
        Ok(film)
    }

    pub async fn update(&self, id: i32, input: FilmInput) -> AppResult<()> {
        let input = input.validate()?;
        self.repo.update(id, &input).await?;
        debug!(film_id = id, "updated film");

        // The index keeps the old version until the next write if this re-read fails.
        match self.repo.find(id).await {
            Ok(film) => self.mirror(&film).await,
            Err(err) => {
                warn!(
                    film_id = id,
                    error = %err,
                    "re-read after update failed, search index is stale"
                );
            },
        }
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repo.delete(id).await?;
        debug!(film_id = id, "deleted film");

        if let Err(err) = self.search.delete(&id.to_string()).await {
            warn!(film_id = id, error = %err, "failed to remove film from search index");
        }
        Ok(())
    }

    pub async fn find(&self, id: i32) -> AppResult<Film> {
        self.repo.find(id).await
    }

    pub async fn find_all(&self) -> AppResult<Vec<Film>> {
        self.repo.find_all().await
    }

    pub async fn search(&self, filters: &SearchFilters) -> AppResult<Vec<Film>> {
        if filters.is_empty() {
            return Ok(Vec::new());
        }

        let query = build_query(filters)?;
        let films = self.search.search(&query).await?;
        debug!(result_count = films.len(), "search completed");
        Ok(films)
    }

    /// Re-indexes every film in the primary store, then drops documents for films that no
    /// longer exist. Index failures are counted, not fatal.
    pub async fn reindex_all(&self) -> AppResult<ReindexReport> {
        let films = self.repo.find_all().await?;
        let total = films.len();
        let live_ids: Vec<i32> = films.iter().map(|film| film.id).collect();

        let rps = NonZeroU32::new(self.reindex_rps).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_second(rps));
        let limiter = &limiter;

        let outcomes: Vec<bool> = stream::iter(films)
            .map(|film| async move {
                limiter.until_ready().await;
                match self.search.index(&FilmDocument::from(&film)).await {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(film_id = film.id, error = %err, "failed to reindex film");
                        false
                    },
                }
            })
            .buffer_unordered(self.reindex_concurrency.max(1))
            .collect()
            .await;

        let indexed = outcomes.iter().filter(|ok| **ok).count();

        let removed = match self.search.prune(&live_ids).await {
            Ok(removed) => removed,
            Err(err) => {
                warn!(error = %err, "failed to prune orphaned documents from search index");
                0
            },
        };

        let report = ReindexReport { total, indexed, failed: total - indexed, removed };
        info!(
            total = report.total,
            indexed = report.indexed,
            failed = report.failed,
            removed = report.removed,
            "reindex finished"
        );
        Ok(report)
    }

    async fn mirror(&self, film: &Film) {
        if let Err(err) = self.search.index(&FilmDocument::from(film)).await {
            warn!(film_id = film.id, error = %err, "failed to index film, search index is stale");
        }
    }
}

/// Actor catalog. Actors live only in the primary store.
#[derive(Clone)]
pub struct ActorService {
    repo: Arc<dyn ActorRepository>,
}

impl ActorService {
    pub fn new(repo: Arc<dyn ActorRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: ActorInput) -> AppResult<Actor> {
        let fields = input.validate()?;
        let actor = self.repo.create(&fields).await?;
        debug!(actor_id = actor.id, "created actor");
        Ok(actor)
    }

    pub async fn update(&self, id: i32, input: ActorInput) -> AppResult<()> {
        let fields = input.validate()?;
        self.repo.update(id, &fields).await?;
        debug!(actor_id = id, "updated actor");
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repo.delete(id).await?;
        debug!(actor_id = id, "deleted actor");
        Ok(())
    }

    pub async fn find(&self, id: i32) -> AppResult<Actor> {
        self.repo.find(id).await
    }

    pub async fn find_all(&self) -> AppResult<Vec<Actor>> {
        self.repo.find_all().await
    }
}
