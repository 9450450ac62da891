mod config;
mod db;
mod entities;
mod error;
mod extract;
mod models;
mod repo;
mod routes;
mod search;
mod service;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::{Config, SearchBackend},
    repo::{SqlActorRepository, SqlFilmRepository},
    search::{FilmSearchIndex, elastic::ElasticFilmIndex, memory::MemoryFilmIndex},
    service::{ActorService, FilmService},
};

pub struct AppState {
    pub films: FilmService,
    pub actors: ActorService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,filmoteka=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let search = search_index(&config).await?;

    let actors = ActorService::new(Arc::new(SqlActorRepository::new(db.clone())));
    let films = FilmService::new(Arc::new(SqlFilmRepository::new(db)), search)
        .with_reindex_limits(config.reindex_concurrency, config.reindex_rps);

    if config.reindex_on_startup {
        // Primary store failures here are fatal; index failures are only counted.
        films.reindex_all().await?;
    }

    let state = Arc::new(AppState { films, actors });

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app(state)).await?;

    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/films", get(routes::list).post(routes::create))
        .route("/films/search", get(routes::search))
        .route("/films/reindex", post(routes::reindex))
        .route("/films/{id}", get(routes::find).put(routes::update).delete(routes::delete))
        .route("/actors", get(routes::list_actors).post(routes::create_actor))
        .route(
            "/actors/{id}",
            get(routes::find_actor).put(routes::update_actor).delete(routes::delete_actor),
        )
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

async fn search_index(config: &Config) -> anyhow::Result<Arc<dyn FilmSearchIndex>> {
    match config.search_backend {
        SearchBackend::Memory => {
            tracing::warn!("Using in-memory search index - contents are lost on restart");
            Ok(Arc::new(MemoryFilmIndex::new()))
        },
        SearchBackend::Elasticsearch => {
            let http = wreq::Client::builder()
                .timeout(Duration::from_secs(config.search_timeout_secs))
                .build()?;

            let index = ElasticFilmIndex::new(
                http,
                config.elasticsearch_url.clone(),
                config.elasticsearch_index.clone(),
                config.search_max_results,
            );

            // The catalog stays available without the index.
            if let Err(err) = index.ensure_index().await {
                tracing::warn!(
                    url = %config.elasticsearch_url,
                    error = %err,
                    "search index unavailable at startup"
                );
            }

            Ok(Arc::new(index))
        },
    }
}
