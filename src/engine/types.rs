use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{IndexField, Record};

pub const HIGHLIGHT_PRE_TAG: &str = "<b>";
pub const HIGHLIGHT_POST_TAG: &str = "</b>";

#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a Value,
    pub from: usize,
    pub size: usize,
    pub highlight: Highlight,
}

/// Highlighting directive covering every bibliographic field.
#[derive(Debug, Serialize)]
pub struct Highlight {
    pub fields: BTreeMap<&'static str, Value>,
    pub pre_tags: Vec<&'static str>,
    pub post_tags: Vec<&'static str>,
}

impl Highlight {
    pub fn all_fields() -> Self {
        Self {
            fields: IndexField::BIBLIOGRAPHIC
                .iter()
                .map(|f| (f.as_str(), Value::Object(Default::default())))
                .collect(),
            pre_tags: vec![HIGHLIGHT_PRE_TAG],
            post_tags: vec![HIGHLIGHT_POST_TAG],
        }
    }
}

/// Response of `POST /{index}/_search?rest_total_hits_as_int=true`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: Hits,
}

#[derive(Debug, Deserialize)]
pub struct Hits {
    pub total: u64,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// One hit as returned by the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: Option<f64>,
    #[serde(rename = "_source")]
    pub source: Record,
    pub highlight: Option<BTreeMap<String, Vec<String>>>,
}

/// Response of `GET /{index}/_doc/{id}`.
#[derive(Debug, Deserialize)]
pub struct GetResponse {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    pub found: bool,
    #[serde(rename = "_source")]
    pub source: Option<Record>,
}

/// Response of `GET /`.
#[derive(Debug, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub cluster_name: String,
    pub version: Option<VersionInfo>,
}

#[derive(Debug, Deserialize)]
pub struct VersionInfo {
    pub number: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BTreeMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItem {
    pub status: u16,
    pub error: Option<Value>,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Structured {
        #[serde(rename = "type")]
        kind: Option<String>,
        reason: Option<String>,
    },
    Plain(String),
}

impl ErrorDetail {
    pub fn describe(&self) -> String {
        match self {
            ErrorDetail::Structured { kind, reason } => match (kind, reason) {
                (Some(kind), Some(reason)) => format!("{kind}: {reason}"),
                (None, Some(reason)) => reason.clone(),
                (Some(kind), None) => kind.clone(),
                (None, None) => "Unknown error".to_string(),
            },
            ErrorDetail::Plain(message) => message.clone(),
        }
    }
}
