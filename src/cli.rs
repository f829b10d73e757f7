use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::evaluation::{DEFAULT_LABELS, DEFAULT_TOTAL_RELEVANT};
use crate::indexing::DEFAULT_BULK_SIZE;
use crate::llm::DEFAULT_TOPIC;

/// Boolean search over the IR Anthology
#[derive(Parser, Debug)]
#[command(name = "anthology-search", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the search demo over HTTP
    Serve {
        /// Port to listen on (overrides DEMO_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Drop the index and rebuild it from the corpus
    Reindex {
        /// Corpus root (overrides DATA_PATH)
        #[arg(long, value_name = "DIR")]
        data_path: Option<PathBuf>,

        /// Documents per bulk request
        #[arg(long, default_value_t = DEFAULT_BULK_SIZE)]
        bulk_size: usize,
    },

    /// Print one indexed record as JSON
    Get {
        /// Document id (the BibTeX key)
        id: String,
    },

    /// Run a query and print one page of results
    Search {
        /// Query-string syntax, e.g. `fairness AND "learning to rank"`
        query: String,

        /// Result page, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Only search in title and abstract
        #[arg(long)]
        title_abstract: bool,
    },

    /// Compute precision, recall and F-measures from evaluation notes
    Evaluate {
        /// Notes file
        file: PathBuf,

        /// Number of relevant documents in the collection
        #[arg(long, default_value_t = DEFAULT_TOTAL_RELEVANT)]
        total_relevant: usize,

        /// Section label, in order (repeatable)
        #[arg(long = "label", value_name = "LABEL")]
        labels: Vec<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask a local model for a Boolean query on a topic
    SuggestQuery {
        #[arg(long, default_value = DEFAULT_TOPIC)]
        topic: String,

        /// Go through sub-topics and synonyms first
        #[arg(long)]
        multi_step: bool,

        /// Model to use (overrides OLLAMA_MODEL)
        #[arg(long)]
        model: Option<String>,
    },
}

/// Labels given on the command line, or the case-study defaults.
pub fn section_labels(labels: Vec<String>) -> Vec<String> {
    if labels.is_empty() {
        DEFAULT_LABELS.iter().map(|s| s.to_string()).collect()
    } else {
        labels
    }
}
