use std::env;
use std::fmt;
use std::path::PathBuf;

use tracing::debug;

const DEFAULT_INDEX_NAME: &str = "iranthology";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_EMBEDDING_DIMS: usize = 1536;
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OLLAMA_MODEL: &str = "gemma2:2b";
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not set. No authentication provided for the search engine.")]
    MissingCredential(&'static str),

    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Password(String);

impl Password {
    #[cfg(test)]
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Engine connection settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub url: String,
    pub username: String,
    pub password: Password,
    pub index: String,
}

/// Local Ollama settings for embeddings and query suggestion.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub embedding_model: String,
}

/// Process configuration, read once at startup and passed by reference.
///
/// Environment variables:
/// - `ES_URL`, `ES_USER`, `ES_PASSWORD`: engine connection (required)
/// - `ES_INDEX_NAME`: index name (default `iranthology`)
/// - `DATA_PATH`: corpus root, only needed for reindexing
/// - `DEMO_PORT`: web server port (default 8080)
/// - `USE_EMBEDDINGS`, `EMBEDDING_DIMS`: optional dense-vector scoring
/// - `OLLAMA_URL`, `OLLAMA_MODEL`, `EMBEDDING_MODEL`: local model endpoints
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub data_path: Option<PathBuf>,
    pub port: u16,
    pub use_embeddings: bool,
    pub embedding_dims: usize,
    pub ollama: OllamaConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let url = var("ES_URL").ok_or(ConfigError::Missing("ES_URL"))?;
        let username = var("ES_USER").ok_or(ConfigError::MissingCredential("ES_USER"))?;
        let password = var("ES_PASSWORD").ok_or(ConfigError::MissingCredential("ES_PASSWORD"))?;

        let port = match var("DEMO_PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "DEMO_PORT",
                value: v,
            })?,
            None => DEFAULT_PORT,
        };

        let use_embeddings = match var("USE_EMBEDDINGS").as_deref() {
            None | Some("0" | "false" | "no" | "off") => false,
            Some("1" | "true" | "yes" | "on") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "USE_EMBEDDINGS",
                    value: other.to_string(),
                });
            }
        };

        let embedding_dims = match var("EMBEDDING_DIMS") {
            Some(v) => v
                .parse()
                .ok()
                .filter(|d: &usize| *d > 0)
                .ok_or(ConfigError::Invalid {
                    name: "EMBEDDING_DIMS",
                    value: v,
                })?,
            None => DEFAULT_EMBEDDING_DIMS,
        };

        let config = Self {
            engine: EngineConfig {
                url: url.trim_end_matches('/').to_string(),
                username,
                password: Password(password),
                index: var("ES_INDEX_NAME").unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            },
            data_path: var("DATA_PATH").map(PathBuf::from),
            port,
            use_embeddings,
            embedding_dims,
            ollama: OllamaConfig {
                url: var("OLLAMA_URL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                model: var("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                embedding_model: var("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            },
        };
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Ollama settings only; these never need engine credentials.
    pub fn ollama_from_env() -> OllamaConfig {
        let var = |name: &str, default: &str| {
            env::var(name)
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        OllamaConfig {
            url: var("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            model: var("OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL),
            embedding_model: var("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    const CREDENTIALS: [(&str, &str); 3] = [
        ("ES_URL", "https://localhost:9200/"),
        ("ES_USER", "elastic"),
        ("ES_PASSWORD", "secret"),
    ];

    #[test]
    fn defaults_apply_when_only_credentials_set() {
        let config = Config::from_lookup(lookup(&CREDENTIALS)).unwrap();
        assert_eq!(config.engine.url, "https://localhost:9200");
        assert_eq!(config.engine.index, "iranthology");
        assert_eq!(config.port, 8080);
        assert!(!config.use_embeddings);
        assert_eq!(config.embedding_dims, 1536);
        assert!(config.data_path.is_none());
        assert_eq!(config.ollama.model, "gemma2:2b");
    }

    #[test]
    fn missing_password_is_fatal() {
        let err = Config::from_lookup(lookup(&CREDENTIALS[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("ES_PASSWORD")));
        assert!(err.to_string().contains("No authentication"));
    }

    #[test]
    fn blank_user_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[
            ("ES_URL", "http://localhost:9200"),
            ("ES_USER", "   "),
            ("ES_PASSWORD", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("ES_USER")));
    }

    #[test]
    fn invalid_port_is_reported() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("DEMO_PORT", "eighty"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "DEMO_PORT", .. }));
    }

    #[test]
    fn embedding_flags_parse() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("USE_EMBEDDINGS", "true"));
        pairs.push(("EMBEDDING_DIMS", "768"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert!(config.use_embeddings);
        assert_eq!(config.embedding_dims, 768);
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let config = Config::from_lookup(lookup(&CREDENTIALS)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
