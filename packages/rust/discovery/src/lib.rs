//! Entity web discovery: search for an entity and return descriptive text.
//!
//! The pipeline looks each row's subject up on the web before extraction.
//! [`WebDiscovery`] queries a Serper-style search endpoint for the entity
//! name, fetches the top organic result, and reduces the page to visible
//! text. If the page cannot be fetched, the search snippets themselves are
//! used as content — the result listing already describes the entity.

mod text;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use leadloom_shared::{LeadloomError, Result};

/// Maximum number of redirects to follow when fetching a result page.
const MAX_REDIRECTS: usize = 3;

/// Timeout in seconds for fetching a result page.
const PAGE_TIMEOUT_SECS: u64 = 30;

/// Maximum response size we consider valid (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of search results folded into the snippet fallback.
const MAX_SNIPPET_RESULTS: usize = 5;

/// User-Agent string for discovery requests.
const USER_AGENT: &str = concat!("LeadLoom/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// EntityDiscovery contract
// ---------------------------------------------------------------------------

/// Raw textual content believed to describe an entity, plus where it came from.
#[derive(Debug, Clone)]
pub struct DiscoveredContent {
    pub content: String,
    pub source_url: String,
}

/// Web content discovery for a single entity name.
///
/// A call may take several seconds and may fail; the pipeline never
/// retries — a failed row keeps its original data.
#[async_trait]
pub trait EntityDiscovery: Send + Sync {
    async fn discover(&self, entity: &str) -> Result<DiscoveredContent>;
}

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for [`WebDiscovery`].
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Search endpoint URL (Serper-compatible).
    pub endpoint: String,
    /// Search API key.
    pub api_key: String,
    /// Timeout for search requests in seconds.
    pub timeout_secs: u64,
}

// ---------------------------------------------------------------------------
// Search response wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

// ---------------------------------------------------------------------------
// WebDiscovery
// ---------------------------------------------------------------------------

/// Search-then-fetch implementation of [`EntityDiscovery`].
pub struct WebDiscovery {
    search_client: Client,
    page_client: Client,
    endpoint: String,
    api_key: String,
}

impl WebDiscovery {
    /// Create a new discovery client with the given options.
    pub fn new(opts: DiscoveryOptions) -> Result<Self> {
        let search_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| LeadloomError::Discovery(format!("failed to build HTTP client: {e}")))?;

        let page_client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(std::time::Duration::from_secs(PAGE_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadloomError::Discovery(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            search_client,
            page_client,
            endpoint: opts.endpoint,
            api_key: opts.api_key,
        })
    }

    /// Run the search query for an entity name.
    #[instrument(skip_all, fields(entity = %entity))]
    async fn search(&self, entity: &str) -> Result<Vec<SearchHit>> {
        let query = format!("{entity} contact information");

        let response = self
            .search_client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&serde_json::json!({ "q": query }))
            .send()
            .await
            .map_err(|e| LeadloomError::Discovery(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadloomError::Discovery(format!(
                "search returned HTTP {status}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| LeadloomError::Discovery(format!("invalid search response: {e}")))?;

        debug!(results = parsed.organic.len(), "search complete");
        Ok(parsed.organic)
    }

    /// Fetch a result page and reduce it to visible text.
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .page_client
            .get(url)
            .send()
            .await
            .map_err(|e| LeadloomError::Discovery(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadloomError::Discovery(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(LeadloomError::Discovery(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| LeadloomError::Discovery(format!("{url}: failed to read body: {e}")))?;

        Ok(text::html_to_text(&body))
    }
}

#[async_trait]
impl EntityDiscovery for WebDiscovery {
    async fn discover(&self, entity: &str) -> Result<DiscoveredContent> {
        let hits = self.search(entity).await?;

        let top = hits
            .iter()
            .find(|h| !h.link.trim().is_empty())
            .cloned()
            .ok_or_else(|| {
                LeadloomError::Discovery(format!("no search results for \"{entity}\""))
            })?;

        match self.fetch_page(&top.link).await {
            Ok(content) if !content.trim().is_empty() => {
                info!(entity, source = %top.link, chars = content.len(), "page content discovered");
                Ok(DiscoveredContent {
                    content,
                    source_url: top.link,
                })
            }
            Ok(_) => {
                warn!(entity, url = %top.link, "page reduced to empty text, using snippets");
                Ok(snippet_fallback(entity, &hits, &top.link))
            }
            Err(e) => {
                warn!(entity, url = %top.link, error = %e, "page fetch failed, using snippets");
                Ok(snippet_fallback(entity, &hits, &top.link))
            }
        }
    }
}

/// Fold search result titles and snippets into a content block.
fn snippet_fallback(entity: &str, hits: &[SearchHit], source_url: &str) -> DiscoveredContent {
    let content = hits
        .iter()
        .take(MAX_SNIPPET_RESULTS)
        .filter(|h| !h.snippet.trim().is_empty() || !h.title.trim().is_empty())
        .map(|h| format!("{}\n{}\n{}", h.title.trim(), h.link.trim(), h.snippet.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    DiscoveredContent {
        content: format!("Search results for \"{entity}\":\n\n{content}"),
        source_url: source_url.to_string(),
    }
}
