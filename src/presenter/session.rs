use serde::Serialize;
use tracing::debug;

use super::pagination::{PAGE_SIZE, PageControl, PageWindow, offset_for, page_controls};
use crate::document::DocumentView;
use crate::engine::EngineError;
use crate::engine::types::SearchResponse;
use crate::query::{Query, QueryRequest};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no query has been submitted yet")]
    NoActiveQuery,
}

/// One issued search. Carries everything needed to execute it and the
/// sequence number used to recognize stale responses.
#[derive(Debug, Clone)]
pub struct Ticket {
    seq: u64,
    page: usize,
    query: Query,
}

impl Ticket {
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn from(&self) -> usize {
        offset_for(self.page)
    }

    pub fn size(&self) -> usize {
        PAGE_SIZE
    }

    pub fn page(&self) -> usize {
        self.page
    }
}

#[derive(Debug)]
enum State {
    Idle,
    Loading,
    Loaded { hits: Vec<DocumentView>, total: u64 },
    Failed(String),
}

/// A fully loaded page of results.
#[derive(Debug, Serialize)]
pub struct ResultPage<'a> {
    #[serde(flatten)]
    pub window: PageWindow,
    pub hits: &'a [DocumentView],
    pub controls: Vec<PageControl>,
}

/// What the result area should show right now.
#[derive(Debug)]
pub enum SessionView<'a> {
    Idle,
    Loading,
    /// Nothing on this page. `window.total` may still be non-zero when the
    /// page lies past the last result.
    Empty(PageWindow),
    Results(ResultPage<'a>),
    /// The last search failed; `message` is for logs, not for display.
    Failed { message: &'a str },
}

/// Pagination state for one query.
///
/// Every `submit` or `navigate` issues a new ticket and drops the current
/// results. `apply` only accepts the outcome of the most recent ticket.
#[derive(Debug)]
pub struct SearchSession {
    request: Option<QueryRequest>,
    page: usize,
    issued: u64,
    state: State,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    pub fn new() -> Self {
        Self {
            request: None,
            page: 1,
            issued: 0,
            state: State::Idle,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn request(&self) -> Option<&QueryRequest> {
        self.request.as_ref()
    }

    /// Start a new query at page 1.
    pub fn submit(&mut self, request: QueryRequest) -> Ticket {
        let query = request.to_query();
        self.request = Some(request);
        self.issue(1, query)
    }

    /// Move the current query to `page` (values below 1 are treated as 1).
    pub fn navigate(&mut self, page: usize) -> Result<Ticket, SessionError> {
        let query = self
            .request
            .as_ref()
            .ok_or(SessionError::NoActiveQuery)?
            .to_query();
        Ok(self.issue(page.max(1), query))
    }

    fn issue(&mut self, page: usize, query: Query) -> Ticket {
        self.issued += 1;
        self.page = page;
        self.state = State::Loading;
        Ticket {
            seq: self.issued,
            page,
            query,
        }
    }

    /// Record the outcome of `ticket`. Returns `false` if a newer ticket has
    /// been issued since, in which case the outcome is dropped.
    pub fn apply(&mut self, ticket: Ticket, outcome: Result<SearchResponse, EngineError>) -> bool {
        if ticket.seq != self.issued {
            debug!(ticket = ticket.seq, latest = self.issued, "discarding stale response");
            return false;
        }
        self.state = match outcome {
            Ok(response) => State::Loaded {
                total: response.hits.total,
                hits: response
                    .hits
                    .hits
                    .into_iter()
                    .map(DocumentView::from_hit)
                    .collect(),
            },
            Err(e) => State::Failed(e.to_string()),
        };
        true
    }

    /// Mark `ticket` as failed before it reached the engine. Stale tickets are
    /// ignored like in `apply`.
    pub fn fail(&mut self, ticket: Ticket, message: impl Into<String>) -> bool {
        if ticket.seq != self.issued {
            debug!(ticket = ticket.seq, latest = self.issued, "discarding stale failure");
            return false;
        }
        self.state = State::Failed(message.into());
        true
    }

    pub fn view(&self) -> SessionView<'_> {
        match &self.state {
            State::Idle => SessionView::Idle,
            State::Loading => SessionView::Loading,
            State::Failed(message) => SessionView::Failed {
                message: message.as_str(),
            },
            State::Loaded { hits, total } => {
                let window = PageWindow::new(self.page, *total);
                if hits.is_empty() {
                    SessionView::Empty(window)
                } else {
                    SessionView::Results(ResultPage {
                        controls: page_controls(self.page, window.num_pages),
                        window,
                        hits: hits.as_slice(),
                    })
                }
            }
        }
    }
}
