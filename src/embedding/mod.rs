//! Text embeddings from a local Ollama server.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::OllamaConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding model '{0}' is not available. Run `ollama pull {0}` first.")]
    ModelNotFound(String),

    #[error("Embedding API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Embedding response contained no vectors")]
    Empty,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Turns text into a fixed-size vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
    truncate: bool,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct OllamaErrorBody {
    error: String,
}

#[derive(Clone, Debug)]
pub struct OllamaEmbedder {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(http: Client, config: &OllamaConfig) -> Self {
        Self {
            http,
            base_url: config.url.clone(),
            model: config.embedding_model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            input: text,
            truncate: true,
        };

        let response = self
            .http
            .post(&url)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(EmbeddingError::ModelNotFound(self.model.clone()));
            }
            warn!(status = status.as_u16(), %message, "embedding request failed");
            return Err(EmbeddingError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: EmbedResponse = response.json().await?;
        let vector = body.embeddings.into_iter().next().ok_or(EmbeddingError::Empty)?;
        debug!(dims = vector.len(), chars = text.len(), "text embedded");
        Ok(vector)
    }
}

/// Embedder handle shared across request handlers.
///
/// The first call triggers a warm-up request that loads the model; concurrent
/// first callers wait for that same warm-up. Once it has succeeded no further
/// synchronization happens. A failed warm-up is retried by the next caller.
pub struct SharedEmbedder<E> {
    inner: E,
    ready: OnceCell<usize>,
}

impl<E: Embedder> SharedEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            ready: OnceCell::new(),
        }
    }

    /// Load the model. Returns the vector dimension it produces.
    pub async fn warm_up(&self) -> Result<usize, EmbeddingError> {
        let dims = self
            .ready
            .get_or_try_init(|| async {
                let probe = self.inner.embed("warm-up").await?;
                info!(dims = probe.len(), "embedding model ready");
                Ok::<_, EmbeddingError>(probe.len())
            })
            .await?;
        Ok(*dims)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.warm_up().await?;
        self.inner.embed(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(vec![text.len() as f32, 0.0, 1.0])
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Empty)
        }
    }

    #[tokio::test]
    async fn warm_up_runs_once_for_concurrent_callers() {
        let shared = Arc::new(SharedEmbedder::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = Arc::clone(&shared);
                tokio::spawn(async move { shared.embed("query").await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), vec![5.0, 0.0, 1.0]);
        }

        // One warm-up plus one embed per caller.
        assert_eq!(shared.inner.calls.load(Ordering::SeqCst), 9);
        assert!(shared.is_ready());
    }

    #[tokio::test]
    async fn failed_warm_up_is_not_cached() {
        let shared = SharedEmbedder::new(FailingEmbedder);
        assert!(shared.embed("x").await.is_err());
        assert!(!shared.is_ready());
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder(server: &MockServer) -> OllamaEmbedder {
        let config = OllamaConfig {
            url: server.uri(),
            model: "gemma2:2b".into(),
            embedding_model: "nomic-embed-text".into(),
        };
        OllamaEmbedder::new(Client::new(), &config)
    }

    #[tokio::test]
    async fn embed_returns_first_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(serde_json::json!({
                "model": "nomic-embed-text",
                "input": "dense retrieval"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "nomic-embed-text",
                "embeddings": [[0.1, 0.2, 0.3]]
            })))
            .mount(&server)
            .await;

        let vector = embedder(&server).embed("dense retrieval").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn missing_model_is_reported_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": "model \"nomic-embed-text\" not found, try pulling it first"
            })))
            .mount(&server)
            .await;

        let err = embedder(&server).embed("x").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::ModelNotFound(ref m) if m == "nomic-embed-text"));
    }

    #[tokio::test]
    async fn empty_embeddings_are_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"embeddings": []})),
            )
            .mount(&server)
            .await;

        let err = embedder(&server).embed("x").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Empty));
    }

    #[tokio::test]
    async fn server_error_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "out of memory"})),
            )
            .mount(&server)
            .await;

        match embedder(&server).embed("x").await.unwrap_err() {
            EmbeddingError::Api { code: 500, message } => assert_eq!(message, "out of memory"),
            other => panic!("expected Api(500), got: {other:?}"),
        }
    }
}
