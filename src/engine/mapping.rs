use serde_json::{Map, Value, json};

use crate::record::IndexField;

fn field_type(field: IndexField) -> &'static str {
    match field {
        IndexField::Name | IndexField::BibType | IndexField::OpenAccess => "keyword",
        IndexField::Year => "integer",
        IndexField::Embedding => "dense_vector",
        _ => "text",
    }
}

/// Field mapping for the anthology index. The dense-vector field is only
/// present when `embedding_dims` is given.
pub fn index_mapping(embedding_dims: Option<usize>) -> Value {
    let mut properties: Map<String, Value> = IndexField::BIBLIOGRAPHIC
        .iter()
        .map(|&f| (f.as_str().to_string(), json!({ "type": field_type(f) })))
        .collect();

    if let Some(dims) = embedding_dims {
        properties.insert(
            IndexField::Embedding.as_str().to_string(),
            json!({
                "type": field_type(IndexField::Embedding),
                "dims": dims,
                "index": true,
                "similarity": "cosine",
            }),
        );
    }

    json!({ "properties": properties })
}
