//! arXiv search client: HTTP GET against the export API, Atom feed parsing.
//!
//! See <https://info.arxiv.org/help/api/user-manual.html>.

use crate::types::Paper;
use sift_core::{AppError, AppResult};
use std::time::Duration;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const BASE_URL: &str = "http://export.arxiv.org/api/query";

/// The export API refuses larger pages.
const MAX_PAGE_SIZE: usize = 2000;

/// Live literature search.
#[async_trait::async_trait]
pub trait PaperSearch: Send + Sync {
    /// Search for papers, giving up after `timeout`.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        timeout: Duration,
    ) -> AppResult<Vec<Paper>>;
}

/// Client for the public arXiv export API.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivClient {
    pub fn new() -> AppResult<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Point the client at a different endpoint (mirrors, tests).
    pub fn with_base_url(base_url: &str) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sift/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Knowledge(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }
}

impl ArxivClient {
    /// Fetch papers by search query, by explicit ids, or both.
    ///
    /// An `id_list` is a comma-separated list of arXiv ids; with a query as
    /// well, the API returns the listed papers that match the query.
    pub async fn fetch(
        &self,
        query: Option<&str>,
        id_list: Option<&str>,
        max_results: usize,
        timeout: Duration,
    ) -> AppResult<Vec<Paper>> {
        let search_query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or("all:all");
        let max_results = if max_results == 0 || max_results > MAX_PAGE_SIZE {
            10
        } else {
            max_results
        };

        let mut params = vec![
            ("search_query", search_query.to_string()),
            ("start", "0".to_string()),
            ("max_results", max_results.to_string()),
        ];
        if let Some(ids) = id_list.map(str::trim).filter(|ids| !ids.is_empty()) {
            params.push(("id_list", ids.to_string()));
        }

        tracing::debug!(max_results, "Querying arXiv");

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AppError::Knowledge(format!("arXiv request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Knowledge(format!(
                "arXiv API error ({})",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to read arXiv response: {}", e)))?;

        parse_atom_feed(&body)
    }
}

#[async_trait::async_trait]
impl PaperSearch for ArxivClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        timeout: Duration,
    ) -> AppResult<Vec<Paper>> {
        self.fetch(Some(query), None, max_results, timeout).await
    }
}

/// Source id for a paper: the arXiv id with `/` replaced by `_`, so old-style
/// ids like `hep-th/9901001v1` stay usable as citation markers.
pub fn paper_source_id(arxiv_id: &str) -> String {
    arxiv_id.trim().replace('/', "_")
}

/// Parse an Atom feed into papers.
///
/// The API reports query errors as a single entry titled "Error"; such
/// entries are dropped, as are entries without an id.
pub fn parse_atom_feed(xml: &str) -> AppResult<Vec<Paper>> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| AppError::Knowledge(format!("Invalid arXiv feed: {}", e)))?;

    let mut papers = Vec::new();
    for entry in doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name((ATOM_NS, "entry")))
    {
        let title = child_text(entry, "title");
        if title.eq_ignore_ascii_case("error") {
            continue;
        }

        let id = strip_abs_prefix(&child_text(entry, "id"));
        if id.is_empty() {
            continue;
        }

        let authors = entry
            .children()
            .filter(|n| n.has_tag_name((ATOM_NS, "author")))
            .map(|author| child_text(author, "name"))
            .filter(|name| !name.is_empty())
            .collect();

        let link = entry
            .children()
            .filter(|n| n.has_tag_name((ATOM_NS, "link")))
            .find(|n| n.attribute("rel") == Some("alternate"))
            .and_then(|n| n.attribute("href"))
            .unwrap_or_default()
            .to_string();

        papers.push(Paper {
            id,
            title,
            abstract_text: child_text(entry, "summary"),
            authors,
            link,
        });
    }

    Ok(papers)
}

/// Text of the first Atom child named `name`, whitespace-collapsed.
fn child_text(node: roxmltree::Node<'_, '_>, name: &str) -> String {
    node.children()
        .find(|n| n.has_tag_name((ATOM_NS, name)))
        .map(|n| {
            n.descendants()
                .filter(|d| d.is_text())
                .filter_map(|d| d.text())
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

fn strip_abs_prefix(id_url: &str) -> String {
    id_url
        .trim()
        .trim_start_matches("http://arxiv.org/abs/")
        .trim_start_matches("https://arxiv.org/abs/")
        .trim_end_matches('/')
        .to_string()
}
