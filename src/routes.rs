use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    error::AppResult,
    extract::{JsonBody, PathParam, QueryParams},
    models::{Actor, ActorInput, Film, FilmInput, ReindexReport, SearchFilters},
};

pub async fn create(
    State(state): State<Arc<AppState>>,
    JsonBody(input): JsonBody<FilmInput>,
) -> AppResult<(StatusCode, Json<Film>)> {
    let film = state.films.create(input).await?;
    Ok((StatusCode::CREATED, Json(film)))
}

pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Film>>> {
    Ok(Json(state.films.find_all().await?))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    QueryParams(filters): QueryParams<SearchFilters>,
) -> AppResult<Json<Vec<Film>>> {
    let filters = filters.normalized();
    Ok(Json(state.films.search(&filters).await?))
}

pub async fn find(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i32>,
) -> AppResult<Json<Film>> {
    Ok(Json(state.films.find(id).await?))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i32>,
    JsonBody(input): JsonBody<FilmInput>,
) -> AppResult<StatusCode> {
    state.films.update(id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i32>,
) -> AppResult<StatusCode> {
    state.films.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reindex(State(state): State<Arc<AppState>>) -> AppResult<Json<ReindexReport>> {
    Ok(Json(state.films.reindex_all().await?))
}

pub async fn create_actor(
    State(state): State<Arc<AppState>>,
    JsonBody(input): JsonBody<ActorInput>,
) -> AppResult<(StatusCode, Json<Actor>)> {
    let actor = state.actors.create(input).await?;
    Ok((StatusCode::CREATED, Json(actor)))
}

pub async fn list_actors(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Actor>>> {
    Ok(Json(state.actors.find_all().await?))
}

pub async fn find_actor(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i32>,
) -> AppResult<Json<Actor>> {
    Ok(Json(state.actors.find(id).await?))
}

pub async fn update_actor(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i32>,
    JsonBody(input): JsonBody<ActorInput>,
) -> AppResult<StatusCode> {
    state.actors.update(id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_actor(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i32>,
) -> AppResult<StatusCode> {
    state.actors.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        db,
        repo::{SqlActorRepository, SqlFilmRepository},
        search::memory::MemoryFilmIndex,
        service::{ActorService, FilmService},
    };

    async fn app() -> Router {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        let films = FilmService::new(
            Arc::new(SqlFilmRepository::new(db.clone())),
            Arc::new(MemoryFilmIndex::new()),
        );
        let actors = ActorService::new(Arc::new(SqlActorRepository::new(db)));
        crate::app(Arc::new(AppState { films, actors }))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            },
            None => Body::empty(),
        };

        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value =
            if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    fn matrix() -> Value {
        json!({
            "title": "The Matrix",
            "description": "A hacker learns the truth.",
            "release_year": 1999,
            "rating": 8.7
        })
    }

    #[tokio::test]
    async fn film_lifecycle() {
        let app = app().await;

        let (status, created) = send(&app, "POST", "/films", Some(matrix())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["title"], "The Matrix");

        let (status, found) = send(&app, "GET", &format!("/films/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found, created);

        let mut changed = matrix();
        changed["rating"] = json!(9.0);
        let (status, _) = send(&app, "PUT", &format!("/films/{id}"), Some(changed)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, all) = send(&app, "GET", "/films", None).await;
        assert_eq!(all.as_array().unwrap().len(), 1);
        assert_eq!(all[0]["rating"], 9.0);

        let (status, _) = send(&app, "DELETE", &format!("/films/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", &format!("/films/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn search_uses_query_parameters() {
        let app = app().await;
        send(&app, "POST", "/films", Some(matrix())).await;
        let mut heat = matrix();
        heat["title"] = json!("Heat");
        heat["release_year"] = json!(1995);
        heat["rating"] = json!(8.3);
        send(&app, "POST", "/films", Some(heat)).await;

        let (status, found) = send(&app, "GET", "/films/search?title=matrix", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["title"], "The Matrix");

        let uri = "/films/search?title=matrix&release_year=1995";
        let (_, found) = send(&app, "GET", uri, None).await;
        assert_eq!(found.as_array().unwrap().len(), 2);

        let (status, found) = send(&app, "GET", "/films/search?title=", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found, json!([]));
    }

    #[tokio::test]
    async fn error_kinds_map_to_statuses() {
        let app = app().await;

        let mut bad = matrix();
        bad["release_year"] = json!(1850);
        let (status, _) = send(&app, "POST", "/films", Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        send(&app, "POST", "/films", Some(matrix())).await;
        let (status, _) = send(&app, "POST", "/films", Some(matrix())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, "PUT", "/films/77", Some(matrix())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", "/films/77", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reindex_reports_counts() {
        let app = app().await;
        send(&app, "POST", "/films", Some(matrix())).await;

        let (status, report) = send(&app, "POST", "/films/reindex", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report, json!({ "total": 1, "indexed": 1, "failed": 0, "removed": 0 }));
    }

    fn error_message(body: &Value) -> &str {
        body["error"].as_str().unwrap_or_else(|| panic!("no error message in {body}"))
    }

    #[tokio::test]
    async fn malformed_requests_are_bad_requests_with_json_errors() {
        let app = app().await;

        let (status, body) = send(&app, "POST", "/films", Some(json!({ "title": "Heat" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error_message(&body).contains("description"), "{body}");

        let (status, body) = send(&app, "GET", "/films/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error_message(&body).starts_with("invalid argument"), "{body}");

        let (status, body) = send(&app, "PUT", "/films/abc", Some(matrix())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        error_message(&body);

        let (status, body) = send(&app, "GET", "/films/search?release_year=soon", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        error_message(&body);

        let (status, body) = send(&app, "DELETE", "/actors/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        error_message(&body);
    }

    fn moss() -> Value {
        json!({ "name": "Carrie-Anne Moss", "gender": "F", "birth_date": "1967-08-21" })
    }

    #[tokio::test]
    async fn actor_lifecycle() {
        let app = app().await;

        let (status, created) = send(&app, "POST", "/actors", Some(moss())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["gender"], "F");
        assert_eq!(created["birth_date"], "1967-08-21");

        let (status, found) = send(&app, "GET", &format!("/actors/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found, created);

        let mut changed = moss();
        changed["name"] = json!("C. A. Moss");
        let (status, _) = send(&app, "PUT", &format!("/actors/{id}"), Some(changed)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, all) = send(&app, "GET", "/actors", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 1);
        assert_eq!(all[0]["name"], "C. A. Moss");

        let (status, _) = send(&app, "DELETE", &format!("/actors/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", &format!("/actors/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_message(&body), format!("actor {id} not found"));
    }

    #[tokio::test]
    async fn actor_errors_map_to_statuses() {
        let app = app().await;

        for (field, value) in [("gender", "X"), ("birth_date", "21.08.1967"), ("name", "Mo")] {
            let mut bad = moss();
            bad[field] = json!(value);
            let (status, body) = send(&app, "POST", "/actors", Some(bad)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{field}");
            assert!(error_message(&body).contains(field), "{body}");
        }

        send(&app, "POST", "/actors", Some(moss())).await;
        let (status, _) = send(&app, "POST", "/actors", Some(moss())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, "PUT", "/actors/77", Some(moss())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn actor_writes_leave_film_search_alone() {
        let app = app().await;
        send(&app, "POST", "/actors", Some(moss())).await;

        let (_, report) = send(&app, "POST", "/films/reindex", None).await;
        assert_eq!(report["total"], 0);
        let (_, found) = send(&app, "GET", "/films/search?title=Moss", None).await;
        assert_eq!(found, json!([]));
    }
}
