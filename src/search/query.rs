use super::{FieldValue, SearchError, SearchField, SearchQuery};
use crate::models::SearchFilters;

/// Builds the index query for a set of filters.
///
/// Clauses are emitted in the order title, description, release year, rating. A single
/// clause is returned bare; several are OR-ed together. Callers must not pass empty
/// filters, which yield [`SearchError::EmptyQuery`].
pub fn build_query(filters: &SearchFilters) -> Result<SearchQuery, SearchError> {
    let mut clauses = Vec::with_capacity(4);

    if let Some(title) = &filters.title {
        clauses.push(SearchQuery::matching(SearchField::Title, FieldValue::Text(title.clone())));
    }
    if let Some(description) = &filters.description {
        clauses.push(SearchQuery::matching(
            SearchField::Description,
            FieldValue::Text(description.clone()),
        ));
    }
    if let Some(year) = filters.release_year {
        clauses.push(SearchQuery::matching(SearchField::ReleaseYear, FieldValue::Integer(year)));
    }
    if let Some(rating) = filters.rating {
        clauses.push(SearchQuery::matching(SearchField::Rating, FieldValue::Float(rating)));
    }

    match clauses.len() {
        0 => Err(SearchError::EmptyQuery),
        1 => Ok(clauses.remove(0)),
        _ => Ok(SearchQuery::Should(clauses)),
    }
}
