//! HTTP surface: the search page, a JSON search API and health checks.

pub mod render;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query as UrlQuery, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::document::DocumentView;
use crate::embedding::{Embedder, OllamaEmbedder, SharedEmbedder};
use crate::engine::{EngineError, SearchEngine};
use crate::presenter::{PageControl, PageWindow, SearchSession, SessionError, SessionView};
use crate::query::QueryRequest;
use render::SearchForm;

pub struct AppState<E, M = OllamaEmbedder> {
    engine: Arc<E>,
    embedder: Option<Arc<SharedEmbedder<M>>>,
}

impl<E, M> Clone for AppState<E, M> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            embedder: self.embedder.clone(),
        }
    }
}

impl<E: SearchEngine> AppState<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            embedder: None,
        }
    }
}

impl<E, M> AppState<E, M> {
    /// Re-score every search by similarity to the query embedding.
    pub fn with_embedder<N: Embedder>(self, embedder: Arc<SharedEmbedder<N>>) -> AppState<E, N> {
        AppState {
            engine: self.engine,
            embedder: Some(embedder),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    page: Option<String>,
    title_abstract: Option<String>,
}

impl SearchParams {
    /// Requested page; anything that is not a positive number means the first page.
    fn page(&self) -> Option<usize> {
        self.page.as_deref().and_then(|p| p.trim().parse().ok())
    }

    fn title_abstract(&self) -> bool {
        matches!(self.title_abstract.as_deref(), Some("on" | "true" | "1"))
    }
}

pub fn router<E, M>(state: AppState<E, M>) -> Router
where
    E: SearchEngine + 'static,
    M: Embedder + 'static,
{
    Router::new()
        .route("/", get(|| async { Redirect::to("/demo") }))
        .route("/demo", get(demo::<E, M>))
        .route("/api/search", get(api_search::<E, M>))
        .route("/api/document/{id}", get(api_document::<E, M>))
        .route("/health", get(health::<E, M>))
        .with_state(state)
}

pub async fn serve<E, M>(state: AppState<E, M>, addr: SocketAddr) -> std::io::Result<()>
where
    E: SearchEngine + 'static,
    M: Embedder + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "demo listening");
    axum::serve(listener, router(state)).await
}

/// Run one search for `input`, jumping to `page` when given.
///
/// When an embedder is configured and the query cannot be embedded, the
/// session ends up failed and the engine is not asked.
pub async fn run_search<E: SearchEngine, M: Embedder>(
    state: &AppState<E, M>,
    input: &str,
    page: Option<usize>,
    title_abstract: bool,
) -> Result<SearchSession, SessionError> {
    let mut request = QueryRequest::new(input, title_abstract);
    let mut embed_error = None;
    if let Some(embedder) = &state.embedder {
        match embedder.embed(input).await {
            Ok(vector) => request = request.with_embedding(vector),
            Err(e) => embed_error = Some(e),
        }
    }

    let mut session = SearchSession::new();
    let mut ticket = session.submit(request);
    if let Some(page) = page.filter(|&p| p > 1) {
        ticket = session.navigate(page)?;
    }

    if let Some(e) = embed_error {
        warn!(error = %e, query = input, "query embedding failed");
        session.fail(ticket, e.to_string());
        return Ok(session);
    }

    debug!(page = ticket.page(), from = ticket.from(), "searching");
    let outcome = state
        .engine
        .search(ticket.query(), ticket.from(), ticket.size())
        .await;
    if let Err(e) = &outcome {
        warn!(error = %e, query = input, "search failed");
    }
    session.apply(ticket, outcome);
    Ok(session)
}

async fn demo<E: SearchEngine, M: Embedder>(
    State(state): State<AppState<E, M>>,
    UrlQuery(params): UrlQuery<SearchParams>,
) -> Html<String> {
    let form = SearchForm {
        query: params.q.as_deref().unwrap_or_default(),
        title_abstract: params.title_abstract(),
    };
    let Some(input) = params.q.as_deref() else {
        return Html(render::page(&form, None));
    };

    match run_search(&state, input, params.page(), form.title_abstract).await {
        Ok(session) => Html(render::page(&form, Some(&session.view()))),
        Err(e) => {
            let message = e.to_string();
            Html(render::page(&form, Some(&SessionView::Failed { message: &message })))
        }
    }
}

#[derive(Serialize)]
struct SearchPage<'a> {
    query: &'a str,
    #[serde(flatten)]
    window: PageWindow,
    hits: &'a [DocumentView],
    controls: &'a [PageControl],
}

#[derive(Serialize)]
struct ApiError {
    error: String,
}

fn api_error(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ApiError { error: error.into() })).into_response()
}

async fn api_search<E: SearchEngine, M: Embedder>(
    State(state): State<AppState<E, M>>,
    UrlQuery(params): UrlQuery<SearchParams>,
) -> Response {
    let Some(input) = params.q.as_deref() else {
        return api_error(StatusCode::BAD_REQUEST, "missing query parameter 'q'");
    };

    let session = match run_search(&state, input, params.page(), params.title_abstract()).await {
        Ok(session) => session,
        Err(e) => return api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    match session.view() {
        SessionView::Results(page) => Json(SearchPage {
            query: input,
            window: page.window,
            hits: page.hits,
            controls: &page.controls,
        })
        .into_response(),
        SessionView::Empty(window) => Json(SearchPage {
            query: input,
            window,
            hits: &[],
            controls: &[],
        })
        .into_response(),
        SessionView::Failed { .. } => api_error(StatusCode::BAD_GATEWAY, render::SEARCH_FAILED),
        SessionView::Idle | SessionView::Loading => {
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "search did not complete")
        }
    }
}

async fn api_document<E: SearchEngine, M: Embedder>(
    State(state): State<AppState<E, M>>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.get_document(&id).await {
        Ok(record) => Json(record).into_response(),
        Err(EngineError::NotFound(_)) => api_error(StatusCode::NOT_FOUND, format!("no document with id '{id}'")),
        Err(e) => {
            warn!(error = %e, %id, "document lookup failed");
            api_error(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

async fn health<E: SearchEngine, M: Embedder>(State(state): State<AppState<E, M>>) -> Json<serde_json::Value> {
    let mut body = json!({ "status": "ok" });
    if let Some(embedder) = &state.embedder {
        body["embedding_model_ready"] = json!(embedder.is_ready());
    }
    Json(body)
}
