//! Retrieval metrics for hand-annotated result lists.
//!
//! Notes format: a free-form header, then a line starting with `-`. After it
//! come result sections separated by lines starting with `#`. In a section a
//! line starting with `R` is a retrieved relevant document, one starting with
//! `N` a retrieved non-relevant one. Lines starting with `Results` are labels.

use std::path::{Path, PathBuf};

use serde::Serialize;

pub const DEFAULT_TOTAL_RELEVANT: usize = 30;

pub const DEFAULT_LABELS: [&str; 3] = [
    "the query from the systematic review paper",
    "the single-prompt LLM-generated query",
    "the multi-step LLM-generated query",
];

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No line starting with '-' marks the start of the results")]
    MissingStartMarker,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub retrieved: usize,
    pub relevant: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub f3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionReport {
    pub label: String,
    #[serde(flatten)]
    pub counts: Counts,
    #[serde(flatten)]
    pub metrics: Metrics,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Weighted harmonic mean of precision and recall.
pub fn f_beta(precision: f64, recall: f64, beta: f64) -> f64 {
    let b2 = beta * beta;
    ratio((1.0 + b2) * precision * recall, b2 * precision + recall)
}

impl Metrics {
    pub fn compute(counts: Counts, total_relevant: usize) -> Self {
        let precision = ratio(counts.relevant as f64, counts.retrieved as f64);
        let recall = ratio(counts.relevant as f64, total_relevant as f64);
        Self {
            precision,
            recall,
            f1: f_beta(precision, recall, 1.0),
            f3: f_beta(precision, recall, 3.0),
        }
    }
}

/// Count retrieved and relevant documents per section.
pub fn parse_sections(notes: &str) -> Result<Vec<Counts>, EvaluationError> {
    let mut lines = notes.lines();
    if !lines.by_ref().any(|line| line.starts_with('-')) {
        return Err(EvaluationError::MissingStartMarker);
    }

    let mut sections = Vec::new();
    let mut current = Counts::default();
    let mut open = false;
    for line in lines {
        if line.starts_with('#') {
            sections.push(current);
            current = Counts::default();
            open = false;
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        open = true;
        if line.starts_with('R') && !line.starts_with("Results") {
            current.retrieved += 1;
            current.relevant += 1;
        } else if line.starts_with('N') {
            current.retrieved += 1;
        }
    }
    if open {
        sections.push(current);
    }
    Ok(sections)
}

/// Metrics for every section, labelled in order. Sections beyond the given
/// labels are numbered.
pub fn evaluate(notes: &str, total_relevant: usize, labels: &[String]) -> Result<Vec<SectionReport>, EvaluationError> {
    Ok(parse_sections(notes)?
        .into_iter()
        .enumerate()
        .map(|(i, counts)| SectionReport {
            label: labels
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("query {}", i + 1)),
            counts,
            metrics: Metrics::compute(counts, total_relevant),
        })
        .collect())
}

pub fn evaluate_file(path: &Path, total_relevant: usize, labels: &[String]) -> Result<Vec<SectionReport>, EvaluationError> {
    let notes = std::fs::read_to_string(path).map_err(|source| EvaluationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    evaluate(&notes, total_relevant, labels)
}

pub fn format_report(reports: &[SectionReport]) -> String {
    let mut out = String::new();
    for report in reports {
        out.push_str(&format!("Results for {}:\n", report.label));
        out.push_str(&format!("#Retrieved: {}\n", report.counts.retrieved));
        out.push_str(&format!("#Relevant: {}\n", report.counts.relevant));
        out.push_str(&format!("Precision: {:.4}\n", report.metrics.precision));
        out.push_str(&format!("Recall: {:.4}\n", report.metrics.recall));
        out.push_str(&format!("F1: {:.4}\n", report.metrics.f1));
        out.push_str(&format!("F3: {:.4}\n\n", report.metrics.f3));
    }
    out
}
