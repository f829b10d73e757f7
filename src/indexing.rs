use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::corpus::{self, CorpusError};
use crate::embedding::{Embedder, SharedEmbedder};
use crate::engine::mapping::index_mapping;
use crate::engine::{EngineClient, EngineError};
use crate::record::Record;

pub const DEFAULT_BULK_SIZE: usize = 100;

const EMBED_CONCURRENCY: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum IndexingError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error("Corpus loading task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug)]
pub struct ReindexReport {
    pub indexed: usize,
    pub batches: usize,
    pub embedding_failures: usize,
}

pub struct ReindexJob<'a, E> {
    pub data_path: PathBuf,
    pub bulk_size: usize,
    /// Embedder and vector dimension for the `embedding` field.
    pub embeddings: Option<(&'a SharedEmbedder<E>, usize)>,
}

/// Rebuild the index from the corpus under `job.data_path`.
///
/// The index is dropped and recreated before the corpus is read, so a failed
/// run leaves an empty or partial index behind.
pub async fn reindex<E: Embedder>(
    client: &EngineClient,
    job: ReindexJob<'_, E>,
) -> Result<ReindexReport, IndexingError> {
    let bulk_size = job.bulk_size.max(1);

    client.delete_index().await?;
    client.create_index().await?;
    client
        .put_mapping(&index_mapping(job.embeddings.map(|(_, dims)| dims)))
        .await?;
    info!(index = client.index_name(), "index reset");

    let mut records = load(job.data_path).await?;

    let mut embedding_failures = 0;
    if let Some((embedder, _)) = job.embeddings {
        embedding_failures = embed_records(embedder, &mut records).await;
    }

    let mut indexed = 0;
    let mut batches = 0;
    for batch in records.chunks(bulk_size) {
        indexed += client.bulk_index(batch).await?;
        batches += 1;
        info!(indexed, total = records.len(), "batch inserted");
    }

    info!(indexed, "successfully indexed documents");
    Ok(ReindexReport {
        indexed,
        batches,
        embedding_failures,
    })
}

async fn load(data_path: PathBuf) -> Result<Vec<Record>, IndexingError> {
    let records = tokio::task::spawn_blocking(move || corpus::load_corpus(&data_path)).await??;
    Ok(records)
}

/// Attach full-text embeddings. Records whose embedding fails are indexed
/// without one; the number of failures is returned.
async fn embed_records<E: Embedder>(embedder: &SharedEmbedder<E>, records: &mut [Record]) -> usize {
    let vectors: Vec<_> = stream::iter(records.iter().map(|r| r.full_text.as_str()))
        .map(|text| embedder.embed(text))
        .buffered(EMBED_CONCURRENCY)
        .collect()
        .await;

    let mut failures = 0;
    for (record, vector) in records.iter_mut().zip(vectors) {
        match vector {
            Ok(vector) => record.embedding = Some(vector),
            Err(e) => {
                failures += 1;
                warn!(name = %record.name, error = %e, "embedding failed, indexing without vector");
            }
        }
    }
    failures
}

/// Resolve the corpus root from the CLI flag or `DATA_PATH`.
pub fn data_path(flag: Option<&Path>, configured: Option<&Path>) -> Option<PathBuf> {
    flag.or(configured).map(Path::to_path_buf)
}
