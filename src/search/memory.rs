use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{FieldValue, FilmDocument, FilmSearchIndex, SearchError, SearchField, SearchQuery};
use crate::models::Film;

/// In-process [`FilmSearchIndex`], used when no Elasticsearch cluster is configured.
///
/// Text matching is case-insensitive on whitespace/punctuation tokens and succeeds when any
/// query token occurs in the field. Numbers match by equality.
#[derive(Default)]
pub struct MemoryFilmIndex {
    docs: RwLock<BTreeMap<i32, FilmDocument>>,
}

impl MemoryFilmIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FilmSearchIndex for MemoryFilmIndex {
    async fn index(&self, doc: &FilmDocument) -> Result<(), SearchError> {
        self.docs.write().await.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn delete(&self, document_id: &str) -> Result<(), SearchError> {
        // Ids that are not ours cannot be present.
        if let Ok(id) = document_id.parse::<i32>() {
            self.docs.write().await.remove(&id);
        }
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Film>, SearchError> {
        let docs = self.docs.read().await;
        Ok(docs.values().filter(|doc| doc_matches(doc, query)).cloned().map(Film::from).collect())
    }

    async fn prune(&self, live_ids: &[i32]) -> Result<u64, SearchError> {
        let live: BTreeSet<i32> = live_ids.iter().copied().collect();
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|id, _| live.contains(id));
        Ok((before - docs.len()) as u64)
    }
}

fn doc_matches(doc: &FilmDocument, query: &SearchQuery) -> bool {
    match query {
        SearchQuery::Should(clauses) => clauses.iter().any(|c| doc_matches(doc, c)),
        SearchQuery::Match { field, value } => match (field, value) {
            (SearchField::Title, FieldValue::Text(text)) => text_matches(&doc.title, text),
            (SearchField::Description, FieldValue::Text(text)) => {
                text_matches(&doc.description, text)
            },
            (SearchField::ReleaseYear, FieldValue::Integer(year)) => doc.release_year == *year,
            (SearchField::Rating, FieldValue::Float(rating)) => doc.rating == *rating,
            _ => false,
        },
    }
}

fn tokens(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).map(str::to_lowercase)
}

fn text_matches(field: &str, query: &str) -> bool {
    let field: Vec<String> = tokens(field).collect();
    tokens(query).any(|t| field.contains(&t))
}

#[cfg(test)]
impl MemoryFilmIndex {
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn clear(&self) {
        self.docs.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i32, title: &str, year: i32, rating: f32) -> FilmDocument {
        FilmDocument {
            id,
            title: title.to_string(),
            description: format!("{title} is a film."),
            release_year: year,
            rating,
        }
    }

    fn title(s: &str) -> SearchQuery {
        SearchQuery::matching(SearchField::Title, FieldValue::Text(s.to_string()))
    }

    #[tokio::test]
    async fn index_then_search_exact_title_round_trips() {
        let index = MemoryFilmIndex::new();
        let matrix = doc(1, "The Matrix", 1999, 8.7);
        index.index(&matrix).await.unwrap();
        index.index(&doc(2, "Heat", 1995, 8.3)).await.unwrap();

        let found = index.search(&title("The Matrix")).await.unwrap();
        assert_eq!(found, vec![Film::from(matrix)]);
    }

    #[tokio::test]
    async fn text_match_is_case_insensitive_on_any_token() {
        let index = MemoryFilmIndex::new();
        index.index(&doc(1, "The Matrix", 1999, 8.7)).await.unwrap();
        index.index(&doc(2, "Matrix Reloaded", 2003, 7.2)).await.unwrap();
        index.index(&doc(3, "Heat", 1995, 8.3)).await.unwrap();

        let ids: Vec<i32> =
            index.search(&title("matrix")).await.unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn should_matches_any_clause() {
        let index = MemoryFilmIndex::new();
        index.index(&doc(1, "The Matrix", 1999, 8.7)).await.unwrap();
        index.index(&doc(2, "Heat", 1995, 8.5)).await.unwrap();
        index.index(&doc(3, "Cats", 2019, 2.8)).await.unwrap();

        let query = SearchQuery::Should(vec![
            title("Matrix"),
            SearchQuery::matching(SearchField::Rating, FieldValue::Float(8.5)),
        ]);
        let ids: Vec<i32> =
            index.search(&query).await.unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn reindex_overwrites_and_delete_is_idempotent() {
        let index = MemoryFilmIndex::new();
        index.index(&doc(1, "Heat", 1995, 8.3)).await.unwrap();
        index.index(&doc(1, "Heat", 1995, 9.0)).await.unwrap();
        assert_eq!(index.len().await, 1);

        let year = SearchQuery::matching(SearchField::ReleaseYear, FieldValue::Integer(1995));
        assert_eq!(index.search(&year).await.unwrap()[0].rating, 9.0);

        index.delete("1").await.unwrap();
        index.delete("1").await.unwrap();
        index.delete("not-a-number").await.unwrap();
        assert!(index.search(&year).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prune_keeps_only_live_ids() {
        let index = MemoryFilmIndex::new();
        index.index(&doc(1, "Heat", 1995, 8.3)).await.unwrap();
        index.index(&doc(2, "Alien", 1979, 8.5)).await.unwrap();
        index.index(&doc(99, "Ghost", 1990, 6.0)).await.unwrap();

        assert_eq!(index.prune(&[1, 2, 3]).await.unwrap(), 1);
        assert!(index.search(&title("Ghost")).await.unwrap().is_empty());
        assert_eq!(index.len().await, 2);

        assert_eq!(index.prune(&[]).await.unwrap(), 2);
        assert_eq!(index.len().await, 0);
    }
}
