//! Read-only view over one search hit.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::engine::types::RawHit;
use crate::html::escape_html;
use crate::record::{IndexField, Record, UnknownField};

/// Number of characters of raw full text shown when the engine returned no
/// full-text highlight.
pub const SNIPPET_FALLBACK_CHARS: usize = 300;

pub const MISSING_SNIPPET: &str = "<em>Cannot show snippet for this query.</em>";

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    UnknownField(#[from] UnknownField),

    #[error("'{0}' is not a stored field")]
    NotStored(IndexField),
}

/// A field value borrowed from the underlying record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue<'a> {
    Text(&'a str),
    List(&'a [String]),
    Year(Option<i32>),
}

/// One hit with its bibliographic fields and highlight fragments.
///
/// The snippet fallback is decided once, when the view is built.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    index: String,
    id: String,
    score: Option<f64>,
    source: Record,
    highlight: BTreeMap<IndexField, Vec<String>>,
}

impl DocumentView {
    pub fn from_hit(hit: RawHit) -> Self {
        let fallback = vec![full_text_prefix(&hit.source.full_text)];

        let highlight = match hit.highlight {
            Some(fragments) => {
                let mut highlight: BTreeMap<IndexField, Vec<String>> = fragments
                    .into_iter()
                    .filter_map(|(name, frags)| name.parse::<IndexField>().ok().map(|f| (f, frags)))
                    .collect();
                let full_text = highlight.entry(IndexField::FullText).or_default();
                if full_text.is_empty() {
                    *full_text = fallback;
                }
                highlight
            }
            None => IndexField::BIBLIOGRAPHIC
                .into_iter()
                .map(|f| {
                    let frags = if f == IndexField::FullText {
                        fallback.clone()
                    } else {
                        vec![MISSING_SNIPPET.to_string()]
                    };
                    (f, frags)
                })
                .collect(),
        };

        Self {
            index: hit.index,
            id: hit.id,
            score: hit.score,
            source: hit.source,
            highlight,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn record(&self) -> &Record {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn bib_type(&self) -> &str {
        &self.source.bib_type
    }

    pub fn title(&self) -> &str {
        &self.source.title
    }

    pub fn year(&self) -> Option<i32> {
        self.source.year
    }

    pub fn booktitle(&self) -> &str {
        &self.source.booktitle
    }

    pub fn series(&self) -> &str {
        &self.source.series
    }

    pub fn author(&self) -> &[String] {
        &self.source.author
    }

    pub fn editor(&self) -> &[String] {
        &self.source.editor
    }

    pub fn full_text(&self) -> &str {
        &self.source.full_text
    }

    pub fn venue(&self) -> &str {
        &self.source.venue
    }

    pub fn url(&self) -> &[String] {
        &self.source.url
    }

    pub fn doi(&self) -> &[String] {
        &self.source.doi
    }

    pub fn openaccess(&self) -> &str {
        &self.source.openaccess
    }

    pub fn abstract_text(&self) -> &str {
        &self.source.abstract_text
    }

    /// Look up a bibliographic field by its index name.
    pub fn field(&self, name: &str) -> Result<FieldValue<'_>, DocumentError> {
        let value = match name.parse::<IndexField>()? {
            IndexField::Name => FieldValue::Text(self.name()),
            IndexField::BibType => FieldValue::Text(self.bib_type()),
            IndexField::Title => FieldValue::Text(self.title()),
            IndexField::Year => FieldValue::Year(self.year()),
            IndexField::Booktitle => FieldValue::Text(self.booktitle()),
            IndexField::Series => FieldValue::Text(self.series()),
            IndexField::Author => FieldValue::List(self.author()),
            IndexField::Editor => FieldValue::List(self.editor()),
            IndexField::FullText => FieldValue::Text(self.full_text()),
            IndexField::Venue => FieldValue::Text(self.venue()),
            IndexField::Url => FieldValue::List(self.url()),
            IndexField::Doi => FieldValue::List(self.doi()),
            IndexField::OpenAccess => FieldValue::Text(self.openaccess()),
            IndexField::Abstract => FieldValue::Text(self.abstract_text()),
            IndexField::Embedding => return Err(DocumentError::NotStored(IndexField::Embedding)),
        };
        Ok(value)
    }

    /// Highlight fragments for `field`; empty when the engine matched nothing there.
    pub fn get_highlight(&self, field: IndexField) -> &[String] {
        self.highlight.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::List(items) => write!(f, "[{}]", items.join(", ")),
            FieldValue::Year(Some(year)) => write!(f, "{year}"),
            FieldValue::Year(None) => Ok(()),
        }
    }
}

const RULE: &str = "-----------------------------------------------------------------------";

/// One `field: value` line per bibliographic field between two rules.
impl fmt::Display for DocumentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        for field in IndexField::BIBLIOGRAPHIC {
            match self.field(field.as_str()) {
                Ok(value) => writeln!(f, "{field}: {value}")?,
                Err(_) => writeln!(f, "{field}:")?,
            }
        }
        f.write_str(RULE)
    }
}

/// First characters of the raw full text, escaped so it renders as literal text.
fn full_text_prefix(full_text: &str) -> String {
    let end = full_text
        .char_indices()
        .nth(SNIPPET_FALLBACK_CHARS)
        .map_or(full_text.len(), |(i, _)| i);
    escape_html(&full_text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(source: serde_json::Value, highlight: Option<serde_json::Value>) -> RawHit {
        let mut raw = json!({
            "_index": "iranthology",
            "_id": "doc-1",
            "_score": 1.5,
            "_source": source,
        });
        if let Some(h) = highlight {
            raw["highlight"] = h;
        }
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn no_highlight_uses_placeholder_and_full_text_prefix() {
        let view = DocumentView::from_hit(hit(json!({"full_text": "x".repeat(400)}), None));

        assert_eq!(view.get_highlight(IndexField::FullText), ["x".repeat(300)]);
        for field in IndexField::BIBLIOGRAPHIC {
            if field != IndexField::FullText {
                assert_eq!(view.get_highlight(field), [MISSING_SNIPPET], "{field}");
            }
        }
    }

    #[test]
    fn empty_full_text_highlight_falls_back_and_keeps_others() {
        let view = DocumentView::from_hit(hit(
            json!({"title": "Neural Ranking", "full_text": "short body"}),
            Some(json!({"title": ["<b>Neural</b> Ranking"], "full_text": []})),
        ));

        assert_eq!(view.get_highlight(IndexField::FullText), ["short body"]);
        assert_eq!(view.get_highlight(IndexField::Title), ["<b>Neural</b> Ranking"]);
        assert!(view.get_highlight(IndexField::Abstract).is_empty());
    }

    #[test]
    fn missing_full_text_key_in_highlight_also_falls_back() {
        let view = DocumentView::from_hit(hit(
            json!({"full_text": "body"}),
            Some(json!({"abstract": ["<b>x</b>"]})),
        ));
        assert_eq!(view.get_highlight(IndexField::FullText), ["body"]);
        assert_eq!(view.get_highlight(IndexField::Abstract), ["<b>x</b>"]);
        assert!(view.get_highlight(IndexField::Title).is_empty());
    }

    #[test]
    fn engine_full_text_highlight_is_kept() {
        let view = DocumentView::from_hit(hit(
            json!({"full_text": "bm25 rocks"}),
            Some(json!({"full_text": ["<b>bm25</b> rocks"]})),
        ));
        assert_eq!(view.get_highlight(IndexField::FullText), ["<b>bm25</b> rocks"]);
    }

    #[test]
    fn fallback_prefix_counts_characters_and_escapes_markup() {
        let text = format!("{}<script>", "ü".repeat(298));
        let view = DocumentView::from_hit(hit(json!({ "full_text": text }), None));
        let snippet = &view.get_highlight(IndexField::FullText)[0];
        assert!(snippet.starts_with(&"ü".repeat(298)));
        assert!(snippet.ends_with("&lt;s"));
    }

    #[test]
    fn empty_full_text_still_yields_a_snippet_entry() {
        let view = DocumentView::from_hit(hit(json!({}), Some(json!({}))));
        assert_eq!(view.get_highlight(IndexField::FullText), [""]);
    }

    #[test]
    fn fields_match_raw_source() {
        let source = json!({
            "name": "smith2020",
            "bib_type": "inproceedings",
            "title": "On Retrieval",
            "year": 2020,
            "booktitle": "SIGIR",
            "series": "SIGIR '20",
            "author": ["Jane Smith", "Li Wei"],
            "editor": [],
            "full_text": "text",
            "venue": "SIGIR",
            "url": ["https://example.org/p"],
            "doi": ["10.1/x"],
            "openaccess": "true",
            "abstract": "We study retrieval."
        });
        let view = DocumentView::from_hit(hit(source.clone(), None));

        assert_eq!(serde_json::to_value(view.record()).unwrap(), source);
        for field in IndexField::BIBLIOGRAPHIC {
            let value = serde_json::to_value(view.field(field.as_str()).unwrap()).unwrap();
            assert_eq!(value, source[field.as_str()], "{field}");
        }
        assert_eq!(view.id(), "doc-1");
        assert_eq!(view.index(), "iranthology");
        assert_eq!(view.score(), Some(1.5));
    }

    #[test]
    fn display_lists_every_field() {
        let view = DocumentView::from_hit(hit(
            json!({"name": "k", "author": ["A", "B"], "year": 2001}),
            None,
        ));
        let text = view.to_string();
        assert!(text.starts_with("---"));
        assert!(text.contains("\nname: k\n"));
        assert!(text.contains("\nauthor: [A, B]\n"));
        assert!(text.contains("\nyear: 2001\n"));
        assert_eq!(text.lines().count(), IndexField::BIBLIOGRAPHIC.len() + 2);
    }

    #[test]
    fn unknown_field_name_is_an_error() {
        let view = DocumentView::from_hit(hit(json!({}), None));
        assert!(matches!(view.field("titel"), Err(DocumentError::UnknownField(_))));
        assert!(matches!(view.field("embedding"), Err(DocumentError::NotStored(_))));
    }
}
