//! Loading the anthology corpus from disk.
//!
//! Layout: `<root>/{conf,jrnl}/**` holds `.bib` bibliographies, one `.txt`
//! full text per paper named after its citation key, and an optional
//! `<key>.json` document with the parsed abstract next to it.

pub mod bibtex;
mod cleanup;

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::record::Record;
use bibtex::BibEntry;

const CORPUS_PATTERNS: [&str; 2] = ["conf/**/*.{bib,txt,json}", "jrnl/**/*.{bib,txt,json}"];

/// Files present in the corpus tree that never describe a paper.
const IGNORED_FILES: [&str; 3] = ["log.txt", "dblp_bibtex_cache.txt", "config.json"];

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Cannot read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Invalid corpus pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Corpus directory {} has no conf/ or jrnl/ subdirectory", .0.display())]
    EmptyRoot(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CorpusError + '_ {
    move |source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Paths of every corpus file, grouped by kind.
#[derive(Debug, Default)]
pub struct CorpusFiles {
    pub bib: Vec<PathBuf>,
    pub txt: BTreeSet<PathBuf>,
    pub json: BTreeSet<PathBuf>,
}

fn corpus_matcher() -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in CORPUS_PATTERNS {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

/// Walk `root` and collect all bibliography, text and JSON files.
pub fn collect_files(root: &Path) -> Result<CorpusFiles, CorpusError> {
    if !root.join("conf").is_dir() && !root.join("jrnl").is_dir() {
        return Err(CorpusError::EmptyRoot(root.to_path_buf()));
    }

    let matcher = corpus_matcher()?;
    let mut files = CorpusFiles::default();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).map_err(io_error(&dir))? {
            let path = entry.map_err(io_error(&dir))?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            if !matcher.is_match(relative) {
                continue;
            }
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if IGNORED_FILES.contains(&name) {
                continue;
            }
            match path.extension().and_then(|e| e.to_str()) {
                Some("bib") => files.bib.push(path),
                Some("txt") => {
                    files.txt.insert(path);
                }
                Some("json") => {
                    files.json.insert(path);
                }
                _ => {}
            }
        }
    }

    files.bib.sort();
    debug!(
        bib = files.bib.len(),
        txt = files.txt.len(),
        json = files.json.len(),
        "corpus files collected"
    );
    Ok(files)
}

/// Read a text file as UTF-8, falling back to Windows-1252 for files that
/// are not valid UTF-8.
pub fn read_text(path: &Path) -> Result<String, CorpusError> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            debug!(path = %path.display(), "not UTF-8, decoding as Windows-1252");
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            Ok(text.into_owned())
        }
    }
}

#[derive(Deserialize)]
struct ParsedDocument {
    #[serde(default)]
    symbols: String,
    #[serde(default)]
    entities: HashMap<String, Vec<Entity>>,
}

#[derive(Deserialize)]
struct Entity {
    #[serde(default)]
    spans: Vec<Span>,
    #[serde(default)]
    metadata: EntityMetadata,
}

#[derive(Deserialize, Default)]
struct EntityMetadata {
    text: Option<String>,
}

#[derive(Deserialize)]
struct Span {
    start: usize,
    end: usize,
}

/// Abstract text of a parsed paper document: the `abstracts` layer entities,
/// concatenated. Returns `None` for anything that does not parse.
pub fn extract_abstract(json: &str) -> Option<String> {
    let doc: ParsedDocument = serde_json::from_str(json).ok()?;
    let chars: Vec<char> = doc.symbols.chars().collect();
    let entities = doc.entities.get("abstracts")?;

    let text = entities
        .iter()
        .map(|entity| match &entity.metadata.text {
            Some(text) => text.clone(),
            None => entity
                .spans
                .iter()
                .map(|span| {
                    let end = span.end.min(chars.len());
                    let start = span.start.min(end);
                    chars[start..end].iter().collect::<String>()
                })
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect();
    Some(text)
}

fn build_record(entry: &BibEntry, full_text: String, abstract_text: String) -> Record {
    let text = |name: &str| entry.field(name).unwrap_or_default().to_string();
    let list = |name: &str| entry.field(name).map(|v| vec![v.to_string()]).unwrap_or_default();

    Record {
        name: entry.key.clone(),
        bib_type: entry.entry_type.clone(),
        title: text("title"),
        year: entry.field("year").and_then(|y| y.trim().parse().ok()),
        booktitle: text("booktitle"),
        series: text("series"),
        author: entry.persons("author"),
        editor: entry.persons("editor"),
        full_text,
        venue: text("venue"),
        url: list("url"),
        doi: list("doi"),
        openaccess: text("openaccess"),
        abstract_text,
        embedding: None,
    }
}

/// Load every bibliography entry under `root` as a cleaned `Record`.
///
/// Entries are returned in bibliography-file order. A citation key seen twice
/// keeps its first position and takes the later entry's data. Bibliographies
/// that fail to parse are skipped with a warning.
pub fn load_corpus(root: &Path) -> Result<Vec<Record>, CorpusError> {
    let files = collect_files(root)?;
    let mut records: Vec<Record> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for bib_path in &files.bib {
        let source = read_text(bib_path)?;
        let entries = match bibtex::parse(&source) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %bib_path.display(), error = %e, "skipping unparseable bibliography");
                skipped += 1;
                continue;
            }
        };
        let dir = bib_path.parent().unwrap_or(root);

        for entry in &entries {
            let txt_path = dir.join(format!("{}.txt", entry.key));
            let (full_text, abstract_text) = if files.txt.contains(&txt_path) {
                let full_text = read_text(&txt_path)?;
                let json_path = dir.join(format!("{}.json", entry.key));
                let abstract_text = if files.json.contains(&json_path) {
                    let raw = read_text(&json_path)?;
                    extract_abstract(&raw).unwrap_or_else(|| {
                        debug!(path = %json_path.display(), "unreadable abstract document");
                        String::new()
                    })
                } else {
                    String::new()
                };
                (full_text, abstract_text)
            } else {
                (String::new(), String::new())
            };

            let record = cleanup::sanitize(build_record(entry, full_text, abstract_text));
            match positions.get(&record.name) {
                Some(&i) => records[i] = record,
                None => {
                    positions.insert(record.name.clone(), records.len());
                    records.push(record);
                }
            }
        }
    }

    info!(
        records = records.len(),
        bibliographies = files.bib.len(),
        skipped,
        "corpus loaded"
    );
    Ok(records)
}
