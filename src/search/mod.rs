pub mod elastic;
pub mod memory;
pub mod query;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::models::Film;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] wreq::Error),

    #[error("{op} returned status {status}")]
    Status { op: &'static str, status: u16 },

    #[error("search query needs at least one filter")]
    EmptyQuery,
}

/// Denormalized, searchable copy of a [`Film`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilmDocument {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub release_year: i32,
    pub rating: f32,
}

impl FilmDocument {
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }
}

impl From<&Film> for FilmDocument {
    fn from(film: &Film) -> Self {
        Self {
            id: film.id,
            title: film.title.clone(),
            description: film.description.clone(),
            release_year: film.release_year,
            rating: film.rating,
        }
    }
}

impl From<FilmDocument> for Film {
    fn from(doc: FilmDocument) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            release_year: doc.release_year,
            rating: doc.rating,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchField {
    Title,
    Description,
    ReleaseYear,
    Rating,
}

impl SearchField {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Description => "description",
            SearchField::ReleaseYear => "release_year",
            SearchField::Rating => "rating",
        }
    }
}

/// A match target. Numbers stay numbers all the way to the wire.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i32),
    Float(f32),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchQuery {
    Match { field: SearchField, value: FieldValue },
    /// Matches documents satisfying any of the clauses.
    Should(Vec<SearchQuery>),
}

impl SearchQuery {
    pub fn matching(field: SearchField, value: FieldValue) -> Self {
        SearchQuery::Match { field, value }
    }

    /// Elasticsearch query DSL form.
    pub fn to_json(&self) -> Value {
        match self {
            SearchQuery::Match { field, value } => json!({ "match": { field.as_str(): value } }),
            SearchQuery::Should(clauses) => {
                let should: Vec<Value> = clauses.iter().map(SearchQuery::to_json).collect();
                json!({ "bool": { "should": should } })
            },
        }
    }
}

/// Secondary store holding a searchable projection of the catalog.
#[async_trait]
pub trait FilmSearchIndex: Send + Sync {
    /// Creates or replaces the document; visible to the next `search`.
    async fn index(&self, doc: &FilmDocument) -> Result<(), SearchError>;

    /// Removing a document that is not there succeeds.
    async fn delete(&self, document_id: &str) -> Result<(), SearchError>;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Film>, SearchError>;

    /// Drops every document whose id is not in `live_ids` and returns how many went.
    async fn prune(&self, live_ids: &[i32]) -> Result<u64, SearchError>;
}
