//! Boolean query suggestion with a local Ollama model.

mod prompts;

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::OllamaConfig;

pub use prompts::DEFAULT_TOPIC;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Model '{0}' is not available. Run `ollama pull {0}` first.")]
    ModelNotFound(String),

    #[error("Ollama API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Single-shot text completion.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, LlmError>> + Send;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct OllamaErrorBody {
    error: String,
}

#[derive(Clone, Debug)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(http: Client, config: &OllamaConfig) -> Self {
        Self {
            http,
            base_url: config.url.clone(),
            model: config.model.clone(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        debug!(model = %self.model, chars = prompt.len(), "sending prompt");
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
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(LlmError::ModelNotFound(self.model.clone()));
            }
            let message = serde_json::from_str::<OllamaErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            warn!(status = status.as_u16(), %message, "generate request failed");
            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response.json().await?;
        let text = body.response.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

/// Intermediate and final answers of the multi-step suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySuggestion {
    pub sub_topics: Option<String>,
    pub synonyms: Option<String>,
    pub query: String,
}

/// Ask for a Boolean query in a single prompt.
pub async fn suggest_query<G: TextGenerator>(
    generator: &G,
    topic: &str,
) -> Result<QuerySuggestion, LlmError> {
    let query = generator.generate(&prompts::direct_query(topic)).await?;
    info!(topic, "query suggested");
    Ok(QuerySuggestion {
        sub_topics: None,
        synonyms: None,
        query,
    })
}

/// Ask for sub-topics, then synonyms for them, then a query built from the
/// synonyms. Each answer is fed into the next prompt.
pub async fn suggest_query_multi_step<G: TextGenerator>(
    generator: &G,
    topic: &str,
) -> Result<QuerySuggestion, LlmError> {
    let sub_topics = generator.generate(&prompts::sub_topics(topic)).await?;
    debug!(%sub_topics, "sub-topics");

    let synonyms = generator.generate(&prompts::synonyms(topic, &sub_topics)).await?;
    debug!(%synonyms, "synonyms");

    let query = generator
        .generate(&prompts::query_from_synonyms(topic, &synonyms))
        .await?;
    info!(topic, "query suggested in three steps");

    Ok(QuerySuggestion {
        sub_topics: Some(sub_topics),
        synonyms: Some(synonyms),
        query,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replies with canned answers in order and records every prompt.
    struct ScriptedGenerator {
        replies: Mutex<Vec<&'static str>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(replies: &[&'static str]) -> Self {
            let mut replies = replies.to_vec();
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .map(str::to_string)
                .ok_or(LlmError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn single_step_returns_model_answer() {
        let generator = ScriptedGenerator::new(&["fairness AND (retrieval OR ranking)"]);
        let suggestion = suggest_query(&generator, "Fairness in IR").await.unwrap();

        assert_eq!(suggestion.query, "fairness AND (retrieval OR ranking)");
        assert!(suggestion.sub_topics.is_none());
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Fairness in IR"));
    }

    #[tokio::test]
    async fn multi_step_chains_answers_into_prompts() {
        let generator = ScriptedGenerator::new(&[
            "- bias\n- transparency",
            "bias: discrimination, unfairness",
            "(bias OR discrimination) AND transparency",
        ]);
        let suggestion = suggest_query_multi_step(&generator, "Ethics in IR").await.unwrap();

        assert_eq!(suggestion.query, "(bias OR discrimination) AND transparency");
        assert_eq!(suggestion.sub_topics.as_deref(), Some("- bias\n- transparency"));

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1].contains("- bias\n- transparency"));
        assert!(prompts[2].contains("bias: discrimination, unfairness"));
        assert!(prompts[2].contains("full_text"));
    }

    #[tokio::test]
    async fn failure_in_a_step_stops_the_chain() {
        let generator = ScriptedGenerator::new(&["- bias"]);
        let err = suggest_query_multi_step(&generator, "Ethics in IR").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
        assert_eq!(generator.prompts.lock().unwrap().len(), 2);
    }
}
