//! Translation of search-box input into engine query objects.
//!
//! The input string is handed to the engine's query-string grammar untouched;
//! Boolean operators, field prefixes and phrase quoting are all resolved by
//! the engine, and malformed syntax only surfaces when the query executes.

use serde::Serialize;
use serde_json::{Value, json};

use crate::record::IndexField;

const COSINE_SCRIPT: &str = "cosineSimilarity(params.query_vector, 'embedding') + 1.0";

/// One search action as issued from the search page.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub input: String,
    pub only_search_title_abstract: bool,
    pub embedding: Option<Vec<f32>>,
}

impl QueryRequest {
    pub fn new(input: impl Into<String>, only_search_title_abstract: bool) -> Self {
        Self {
            input: input.into(),
            only_search_title_abstract,
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// The engine query for this request, re-scored by similarity when an
    /// embedding is attached.
    pub fn to_query(&self) -> Query {
        let query = build_query(&self.input, self.only_search_title_abstract);
        match &self.embedding {
            Some(embedding) => build_dense_vector_query(query, embedding),
            None => query,
        }
    }
}

/// Engine query object of the form `{"query": <clause>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    query: Value,
}

impl Query {
    /// The clause sent as the `query` member of a search body.
    pub fn clause(&self) -> &Value {
        &self.query
    }
}

/// Build a query-string query. With `only_search_title_abstract` the query is
/// scoped to exactly title and abstract; otherwise full text is the default
/// searched field.
pub fn build_query(input: &str, only_search_title_abstract: bool) -> Query {
    let mut query_string = json!({ "query": input });
    if only_search_title_abstract {
        query_string["fields"] = json!([IndexField::Title.as_str(), IndexField::Abstract.as_str()]);
    } else {
        query_string["default_field"] = json!(IndexField::FullText.as_str());
    }
    Query {
        query: json!({ "query_string": query_string }),
    }
}

/// Wrap `query` so matches are re-scored by cosine similarity (+1.0) against
/// `embedding`. The wrapped query still decides which documents match.
pub fn build_dense_vector_query(query: Query, embedding: &[f32]) -> Query {
    Query {
        query: json!({
            "script_score": {
                "query": query.query,
                "script": {
                    "source": COSINE_SCRIPT,
                    "params": { "query_vector": embedding },
                }
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_text_default_field_when_not_scoped() {
        let query = serde_json::to_value(build_query("information retrieval", false)).unwrap();
        let qs = &query["query"]["query_string"];
        assert_eq!(qs["query"], "information retrieval");
        assert_eq!(qs["default_field"], "full_text");
        assert!(qs.get("fields").is_none());
    }

    #[test]
    fn title_abstract_scope_sets_fields_only() {
        let query = serde_json::to_value(build_query("fairness AND ethics", true)).unwrap();
        let qs = &query["query"]["query_string"];
        assert_eq!(qs["query"], "fairness AND ethics");
        assert_eq!(qs["fields"], json!(["title", "abstract"]));
        assert!(qs.get("default_field").is_none());
    }

    #[test]
    fn input_passes_through_unmodified() {
        for input in ["", "title:\"neural ranking\" OR (bm25 AND NOT dense)", "(((", "a\nb"] {
            for scoped in [true, false] {
                let query = build_query(input, scoped);
                assert_eq!(query.clause()["query_string"]["query"], input);
            }
        }
    }

    #[test]
    fn building_twice_is_identical() {
        for scoped in [true, false] {
            assert_eq!(build_query("bm25 OR tf-idf", scoped), build_query("bm25 OR tf-idf", scoped));
        }
    }

    #[test]
    fn dense_vector_query_wraps_original() {
        let inner = build_query("ranking", false);
        let wrapped = serde_json::to_value(build_dense_vector_query(inner.clone(), &[0.5, 0.25])).unwrap();
        let script_score = &wrapped["query"]["script_score"];
        assert_eq!(&script_score["query"], inner.clause());
        assert_eq!(
            script_score["script"]["source"],
            "cosineSimilarity(params.query_vector, 'embedding') + 1.0"
        );
        assert_eq!(script_score["script"]["params"]["query_vector"], json!([0.5, 0.25]));
    }

    #[test]
    fn request_with_embedding_builds_script_score() {
        let request = QueryRequest::new("ranking", true).with_embedding(vec![1.0]);
        let query = request.to_query();
        let inner = &query.clause()["script_score"]["query"]["query_string"];
        assert_eq!(inner["fields"], json!(["title", "abstract"]));
    }

    #[test]
    fn request_without_embedding_is_plain_query() {
        let request = QueryRequest::new("ranking", false);
        assert_eq!(request.to_query(), build_query("ranking", false));
    }
}
