//! Result paging: window arithmetic, the page-number control model and the
//! per-query session that ties requests to responses.

mod pagination;
mod session;

pub use pagination::{PageControl, PageWindow};
pub use session::{ResultPage, SearchSession, SessionError, SessionView};
