//! Server-side HTML for the search page.
//!
//! Every value taken from a record or from the request is escaped. Highlight
//! fragments come from the engine with `<b>` markup and are inserted as-is.

use crate::document::DocumentView;
use crate::html::{encode_query_value, escape_html};
use crate::presenter::{PageControl, PageWindow, ResultPage, SessionView};
use crate::record::IndexField;

pub const TITLE: &str = "IR Anthology - Boolean Search Demo";

pub const NO_RESULTS: &str = "No results with this query.";

pub const SEARCH_FAILED: &str =
    "Something went wrong. Please make sure to use the search operators correctly!";

const SYNTAX_DOCS: &str = "https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-query-string-query.html#query-string-syntax";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; }
main { width: 66%; margin: 2rem auto; }
h1 { font-size: 300%; text-align: center; }
h1 .brand { color: #9f371d; }
form { display: flex; gap: .75rem; align-items: center; justify-content: center; flex-wrap: wrap; }
form input[type=search] { flex: 1; padding: .5rem 1rem; border-radius: 2rem; border: 1px solid #888; }
.summary { display: flex; justify-content: space-between; margin: 1rem 0; }
.result { margin-bottom: 1.25rem; }
.result a.title { font-size: 120%; font-weight: bold; color: #9f371d; text-decoration: none; }
.error { color: red; }
.pagination { display: flex; gap: .5rem; justify-content: center; }
.pagination .current { font-weight: bold; }
#spinner { display: none; text-align: center; color: #9f371d; }
"#;

// Locks the input and shows the spinner while a search is in flight.
// `pageshow` also fires on back/forward navigation.
const SCRIPT: &str = r#"
const form = document.getElementById('search');
const input = document.getElementById('q');
const spinner = document.getElementById('spinner');
form.addEventListener('submit', () => { input.readOnly = true; spinner.style.display = 'block'; });
document.querySelectorAll('.pagination a').forEach((a) => {
  a.addEventListener('click', () => { input.readOnly = true; spinner.style.display = 'block'; });
});
window.addEventListener('pageshow', () => {
  input.readOnly = false;
  spinner.style.display = 'none';
});
"#;

/// Current state of the search form.
#[derive(Debug, Clone, Copy)]
pub struct SearchForm<'a> {
    pub query: &'a str,
    pub title_abstract: bool,
}

impl SearchForm<'_> {
    fn page_link(&self, page: usize) -> String {
        let mut link = format!("/demo?q={}&page={page}", encode_query_value(self.query));
        if self.title_abstract {
            link.push_str("&title_abstract=on");
        }
        link
    }
}

pub fn page(form: &SearchForm<'_>, view: Option<&SessionView<'_>>) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str(&format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<main>\n\
         <h1><span class=\"brand\">IR</span> Anthology - Boolean Search Demo</h1>\n"
    ));
    search_form(&mut html, form);
    html.push_str("<hr>\n<div id=\"spinner\">Searching&hellip;</div>\n<section id=\"results\">\n");
    if let Some(view) = view {
        results(&mut html, form, view);
    }
    html.push_str(&format!("</section>\n</main>\n<script>{SCRIPT}</script>\n</body>\n</html>\n"));
    html
}

fn search_form(html: &mut String, form: &SearchForm<'_>) {
    let checked = if form.title_abstract { " checked" } else { "" };
    html.push_str(&format!(
        "<form id=\"search\" action=\"/demo\" method=\"get\">\n\
         <input type=\"search\" id=\"q\" name=\"q\" value=\"{}\" placeholder=\"Search the IR-Anthology...\" autofocus>\n\
         <button type=\"submit\">Search</button>\n\
         <label><input type=\"checkbox\" name=\"title_abstract\" value=\"on\"{checked}> Only search in title and abstract</label>\n\
         <a href=\"{SYNTAX_DOCS}\" target=\"_blank\" rel=\"noopener\" title=\"View the query syntax documentation.\">Query syntax</a>\n\
         </form>\n",
        escape_html(form.query)
    ));
}

fn results(html: &mut String, form: &SearchForm<'_>, view: &SessionView<'_>) {
    match view {
        SessionView::Idle => {}
        SessionView::Loading => html.push_str("<p>Searching&hellip;</p>\n"),
        SessionView::Empty(_) => html.push_str(&format!("<p>{NO_RESULTS}</p>\n")),
        SessionView::Failed { .. } => html.push_str(&format!("<p class=\"error\">{SEARCH_FAILED}</p>\n")),
        SessionView::Results(page) => result_page(html, form, page),
    }
}

fn result_page(html: &mut String, form: &SearchForm<'_>, page: &ResultPage<'_>) {
    summary(html, &page.window);
    for hit in page.hits {
        result_card(html, hit);
    }
    pagination(html, form, &page.controls);
}

fn summary(html: &mut String, window: &PageWindow) {
    html.push_str(&format!(
        "<div class=\"summary\"><span>Showing results {}-{}.</span><span>Total results: {}</span></div>\n",
        window.first, window.last, window.total
    ));
}

fn result_card(html: &mut String, hit: &DocumentView) {
    let title = escape_html(hit.title());
    html.push_str("<article class=\"result\">\n");
    match hit.record().primary_url() {
        Some(url) => html.push_str(&format!(
            "<a class=\"title\" href=\"{}\" target=\"_blank\" rel=\"noopener\">{title}</a>\n",
            escape_html(url)
        )),
        None => html.push_str(&format!("<span class=\"title\">{title}</span>\n")),
    }
    let year = hit.year().map(|y| y.to_string()).unwrap_or_default();
    html.push_str(&format!("<div>Year: {year}</div>\n"));
    html.push_str(&format!("<div>Venue: {}</div>\n", escape_html(hit.venue())));
    html.push_str(&format!("<div>Authors: {}</div>\n", escape_html(&hit.author().join("; "))));
    html.push_str(&format!(
        "<div class=\"snippet\">{}</div>\n",
        hit.get_highlight(IndexField::FullText).join(" &hellip; ")
    ));
    html.push_str("</article>\n");
}

fn pagination(html: &mut String, form: &SearchForm<'_>, controls: &[PageControl]) {
    if controls.is_empty() {
        return;
    }
    html.push_str("<nav class=\"pagination\">\n");
    for control in controls {
        let item = match *control {
            PageControl::Previous(page) => format!(
                "<a href=\"{}\" aria-label=\"Previous page\">&lsaquo;</a>",
                escape_html(&form.page_link(page))
            ),
            PageControl::Next(page) => format!(
                "<a href=\"{}\" aria-label=\"Next page\">&rsaquo;</a>",
                escape_html(&form.page_link(page))
            ),
            PageControl::Page { number, current: true } => {
                format!("<span class=\"current\" aria-current=\"page\">{number}</span>")
            }
            PageControl::Page { number, current: false } => {
                format!("<a href=\"{}\">{number}</a>", escape_html(&form.page_link(number)))
            }
            PageControl::Gap => "<span>&hellip;</span>".to_string(),
        };
        html.push_str(&item);
        html.push('\n');
    }
    html.push_str("</nav>\n");
}
