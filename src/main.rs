mod cli;
mod config;
mod corpus;
mod document;
mod embedding;
mod engine;
mod evaluation;
mod html;
mod indexing;
mod llm;
mod presenter;
mod query;
mod record;
mod web;

pub const USER_AGENT: &str = concat!("anthology-search/", env!("CARGO_PKG_VERSION"));

use std::error::Error;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::{info, warn};

use cli::{Cli, Command};
use config::Config;
use embedding::{OllamaEmbedder, SharedEmbedder};
use engine::{EngineClient, SearchEngine};
use indexing::ReindexJob;
use llm::OllamaClient;
use presenter::SessionView;
use web::AppState;

fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
}

/// Separate client for Ollama; generation and embedding requests carry their own timeouts.
fn ollama_http_client() -> Result<Client, reqwest::Error> {
    Client::builder().connect_timeout(Duration::from_secs(10)).build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("anthology_search=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port } => serve(port).await,
        Command::Reindex {
            data_path,
            bulk_size,
        } => reindex(data_path, bulk_size).await,
        Command::Get { id } => get(&id).await,
        Command::Search {
            query,
            page,
            title_abstract,
        } => search(&query, page, title_abstract).await,
        Command::Evaluate {
            file,
            total_relevant,
            labels,
            json,
        } => {
            let reports = evaluation::evaluate_file(&file, total_relevant, &cli::section_labels(labels))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print!("{}", evaluation::format_report(&reports));
            }
            Ok(())
        }
        Command::SuggestQuery {
            topic,
            multi_step,
            model,
        } => suggest(&topic, multi_step, model).await,
    }
}

fn embedder(config: &Config) -> Result<Option<Arc<SharedEmbedder<OllamaEmbedder>>>, reqwest::Error> {
    if !config.use_embeddings {
        return Ok(None);
    }
    let inner = OllamaEmbedder::new(ollama_http_client()?, &config.ollama);
    info!(model = inner.model(), "dense-vector scoring enabled");
    Ok(Some(Arc::new(SharedEmbedder::new(inner))))
}

async fn serve(port: Option<u16>) -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let engine = EngineClient::new(http_client()?, &config.engine);
    engine.connect().await?;

    let mut state = AppState::new(engine);
    if let Some(embedder) = embedder(&config)? {
        if let Err(e) = embedder.warm_up().await {
            warn!(error = %e, "embedding model not ready, retrying on first search");
        }
        state = state.with_embedder(embedder);
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port.unwrap_or(config.port)));
    web::serve(state, addr).await?;
    info!("server stopped");
    Ok(())
}

async fn reindex(flag: Option<std::path::PathBuf>, bulk_size: usize) -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let data_path = indexing::data_path(flag.as_deref(), config.data_path.as_deref())
        .ok_or("No corpus location: pass --data-path or set DATA_PATH")?;

    let engine = EngineClient::new(http_client()?, &config.engine);
    engine.connect().await?;

    let embedder = embedder(&config)?;
    let report = indexing::reindex(
        &engine,
        ReindexJob {
            data_path,
            bulk_size,
            embeddings: embedder.as_deref().map(|e| (e, config.embedding_dims)),
        },
    )
    .await?;

    if report.embedding_failures > 0 {
        warn!(failures = report.embedding_failures, "some documents were indexed without embeddings");
    }
    println!("Successfully indexed {} documents.", report.indexed);
    Ok(())
}

async fn get(id: &str) -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let engine = EngineClient::new(http_client()?, &config.engine);
    let record = engine.get_document(id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn search(query: &str, page: usize, title_abstract: bool) -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let mut state = AppState::new(EngineClient::new(http_client()?, &config.engine));
    if let Some(embedder) = embedder(&config)? {
        state = state.with_embedder(embedder);
    }

    let session = web::run_search(&state, query, Some(page), title_abstract).await?;
    if let Some(request) = session.request() {
        info!(query = %request.input, page = session.page(), "search finished");
    }
    match session.view() {
        SessionView::Results(results) => {
            println!(
                "Showing results {}-{}. Total results: {}",
                results.window.first, results.window.last, results.window.total
            );
            for hit in results.hits {
                let score = hit.score().map(|s| format!("{s:.3}")).unwrap_or_default();
                println!("{}/{} {score}\n{hit}", hit.index(), hit.id());
            }
        }
        SessionView::Empty(_) => println!("{}", web::render::NO_RESULTS),
        SessionView::Failed { message } => {
            eprintln!("{}", web::render::SEARCH_FAILED);
            return Err(message.into());
        }
        SessionView::Idle | SessionView::Loading => {}
    }
    Ok(())
}

async fn suggest(topic: &str, multi_step: bool, model: Option<String>) -> Result<(), Box<dyn Error>> {
    let config = Config::ollama_from_env();
    let mut client = OllamaClient::new(ollama_http_client()?, &config);
    if let Some(model) = model {
        client = client.with_model(model);
    }
    info!(model = client.model(), multi_step, "suggesting query");

    let suggestion = if multi_step {
        llm::suggest_query_multi_step(&client, topic).await?
    } else {
        llm::suggest_query(&client, topic).await?
    };

    if let Some(sub_topics) = &suggestion.sub_topics {
        println!("Sub-topics:\n{sub_topics}\n");
    }
    if let Some(synonyms) = &suggestion.synonyms {
        println!("Synonyms:\n{synonyms}\n");
    }
    println!("Query:\n{}", suggestion.query);
    Ok(())
}
