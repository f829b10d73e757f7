use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fields of the anthology index, by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexField {
    Name,
    BibType,
    Title,
    Year,
    Booktitle,
    Series,
    Author,
    Editor,
    FullText,
    Venue,
    Url,
    Doi,
    OpenAccess,
    Abstract,
    Embedding,
}

impl IndexField {
    /// Every field of a publication record. `Embedding` is not one of them.
    pub const BIBLIOGRAPHIC: [IndexField; 14] = [
        IndexField::Name,
        IndexField::BibType,
        IndexField::Title,
        IndexField::Year,
        IndexField::Booktitle,
        IndexField::Series,
        IndexField::Author,
        IndexField::Editor,
        IndexField::FullText,
        IndexField::Venue,
        IndexField::Url,
        IndexField::Doi,
        IndexField::OpenAccess,
        IndexField::Abstract,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndexField::Name => "name",
            IndexField::BibType => "bib_type",
            IndexField::Title => "title",
            IndexField::Year => "year",
            IndexField::Booktitle => "booktitle",
            IndexField::Series => "series",
            IndexField::Author => "author",
            IndexField::Editor => "editor",
            IndexField::FullText => "full_text",
            IndexField::Venue => "venue",
            IndexField::Url => "url",
            IndexField::Doi => "doi",
            IndexField::OpenAccess => "openaccess",
            IndexField::Abstract => "abstract",
            IndexField::Embedding => "embedding",
        }
    }
}

impl fmt::Display for IndexField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IndexField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown index field: '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for IndexField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndexField::BIBLIOGRAPHIC
            .into_iter()
            .chain([IndexField::Embedding])
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// One publication as stored in the index.
///
/// Every field is always present. Text fields default to `""`, list fields to
/// `[]`, and `year` to `null` since the index maps it as an integer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub name: String,
    pub bib_type: String,
    pub title: String,
    #[serde(deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    pub booktitle: String,
    pub series: String,
    pub author: Vec<String>,
    pub editor: Vec<String>,
    pub full_text: String,
    pub venue: String,
    #[serde(deserialize_with = "one_or_many")]
    pub url: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub doi: Vec<String>,
    pub openaccess: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Record {
    /// First URL of the record, used as the link target of a result card.
    pub fn primary_url(&self) -> Option<&str> {
        self.url.iter().map(String::as_str).find(|u| !u.is_empty())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
    Null(()),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearRepr {
    Number(i64),
    Text(String),
    Null(()),
}

fn lenient_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    Ok(match YearRepr::deserialize(deserializer)? {
        YearRepr::Number(n) => i32::try_from(n).ok(),
        YearRepr::Text(s) => s.trim().parse().ok(),
        YearRepr::Null(()) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_round_trip_through_from_str() {
        for field in IndexField::BIBLIOGRAPHIC {
            assert_eq!(field.as_str().parse::<IndexField>().unwrap(), field);
        }
        assert_eq!("embedding".parse::<IndexField>().unwrap(), IndexField::Embedding);
    }

    #[test]
    fn unknown_field_name_is_rejected() {
        let err = "titel".parse::<IndexField>().unwrap_err();
        assert!(err.to_string().contains("titel"));
    }

    #[test]
    fn bibliographic_fields_exclude_embedding() {
        assert!(!IndexField::BIBLIOGRAPHIC.contains(&IndexField::Embedding));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let record: Record = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(record.name, "x");
        assert_eq!(record.title, "");
        assert!(record.author.is_empty());
        assert!(record.url.is_empty());
        assert_eq!(record.year, None);
    }

    #[test]
    fn url_and_doi_accept_string_or_list() {
        let record: Record = serde_json::from_value(serde_json::json!({
            "url": "https://example.org/a",
            "doi": ["10.1/a", "10.1/b"],
        }))
        .unwrap();
        assert_eq!(record.url, vec!["https://example.org/a"]);
        assert_eq!(record.doi.len(), 2);

        let empty: Record = serde_json::from_value(serde_json::json!({"url": ""})).unwrap();
        assert!(empty.url.is_empty());
    }

    #[test]
    fn year_accepts_numbers_strings_and_blanks() {
        let from_number: Record = serde_json::from_value(serde_json::json!({"year": 2019})).unwrap();
        assert_eq!(from_number.year, Some(2019));

        let from_string: Record = serde_json::from_value(serde_json::json!({"year": "2020"})).unwrap();
        assert_eq!(from_string.year, Some(2020));

        let blank: Record = serde_json::from_value(serde_json::json!({"year": ""})).unwrap();
        assert_eq!(blank.year, None);
    }

    #[test]
    fn abstract_uses_wire_name() {
        let record = Record {
            abstract_text: "summary".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["abstract"], "summary");
        assert!(value.get("embedding").is_none());
    }
}
