use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{FilmDocument, FilmSearchIndex, SearchError, SearchQuery};
use crate::models::Film;

/// [`FilmSearchIndex`] backed by an Elasticsearch index over its REST API.
pub struct ElasticFilmIndex {
    client: wreq::Client,
    base_url: String,
    index: String,
    max_results: usize,
}

impl ElasticFilmIndex {
    pub fn new(client: wreq::Client, base_url: String, index: String, max_results: usize) -> Self {
        Self { client, base_url, index, max_results }
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.index)
    }

    fn doc_url(&self, document_id: &str) -> String {
        format!("{}/_doc/{}", self.index_url(), document_id)
    }

    /// Document writes refresh the index so the change is visible to the next search.
    fn write_url(&self, document_id: &str) -> String {
        format!("{}?refresh=true", self.doc_url(document_id))
    }

    fn prune_url(&self) -> String {
        format!("{}/_delete_by_query?refresh=true&conflicts=proceed", self.index_url())
    }

    /// Creates the index with explicit field mappings unless it already exists.
    pub async fn ensure_index(&self) -> Result<(), SearchError> {
        let resp = self.client.head(self.index_url()).send().await?;
        if resp.status().is_success() {
            debug!(index = %self.index, "search index exists");
            return Ok(());
        }
        if resp.status().as_u16() != 404 {
            return Err(SearchError::Status { op: "index exists", status: resp.status().as_u16() });
        }

        let resp = self.client.put(self.index_url()).json(&index_mappings()).send().await?;
        check_status("create index", resp.status().as_u16())?;

        info!(index = %self.index, "created search index");
        Ok(())
    }

    fn search_body(&self, query: &SearchQuery) -> Value {
        json!({ "query": query.to_json(), "size": self.max_results })
    }
}

#[async_trait]
impl FilmSearchIndex for ElasticFilmIndex {
    async fn index(&self, doc: &FilmDocument) -> Result<(), SearchError> {
        let resp = self.client.put(self.write_url(&doc.document_id())).json(doc).send().await?;
        check_status("index document", resp.status().as_u16())
    }

    async fn delete(&self, document_id: &str) -> Result<(), SearchError> {
        let resp = self.client.delete(self.write_url(document_id)).send().await?;
        delete_outcome(resp.status().as_u16())
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Film>, SearchError> {
        let body = self.search_body(query);
        debug!(index = %self.index, query = %body, "searching films");

        let resp = self
            .client
            .post(format!("{}/_search", self.index_url()))
            .json(&body)
            .send()
            .await?;
        check_status("search", resp.status().as_u16())?;

        let resp: SearchResponse = resp.json().await?;
        Ok(resp.into_films())
    }

    async fn prune(&self, live_ids: &[i32]) -> Result<u64, SearchError> {
        let resp = self.client.post(self.prune_url()).json(&prune_body(live_ids)).send().await?;
        check_status("prune documents", resp.status().as_u16())?;

        let resp: DeleteByQueryResponse = resp.json().await?;
        Ok(resp.deleted)
    }
}

fn check_status(op: &'static str, status: u16) -> Result<(), SearchError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(SearchError::Status { op, status })
    }
}

/// A document that is already gone counts as deleted.
fn delete_outcome(status: u16) -> Result<(), SearchError> {
    if status == 404 {
        return Ok(());
    }
    check_status("delete document", status)
}

/// Matches every document whose `_id` is not one of `live_ids`.
fn prune_body(live_ids: &[i32]) -> Value {
    let ids: Vec<String> = live_ids.iter().map(i32::to_string).collect();
    json!({ "query": { "bool": { "must_not": { "ids": { "values": ids } } } } })
}

fn index_mappings() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "integer" },
                "title": { "type": "text" },
                "description": { "type": "text" },
                "release_year": { "type": "integer" },
                "rating": { "type": "float" },
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

impl SearchResponse {
    fn into_films(self) -> Vec<Film> {
        self.hits.hits.into_iter().map(|hit| hit.source.into()).collect()
    }
}

#[derive(Debug, Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: FilmDocument,
}

#[derive(Debug, Deserialize)]
struct DeleteByQueryResponse {
    deleted: u64,
}
