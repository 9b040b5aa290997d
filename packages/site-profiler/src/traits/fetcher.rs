//! Fetcher trait — the page-retrieval capability.

use async_trait::async_trait;

use crate::error::FetchResult;

/// A successfully retrieved page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL the fetch was issued for.
    pub url: String,

    /// URL after redirects; the crawler re-derives the crawl domain from
    /// this on the root fetch.
    pub final_url: String,

    /// Body, truncated to the caller's byte cap.
    pub html: String,

    /// HTTP status code.
    pub status: u16,
}

impl FetchedPage {
    /// Build a page with no redirect (final URL equals requested URL).
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            html: html.into(),
            status: 200,
        }
    }

    /// Set the post-redirect URL.
    pub fn with_final_url(mut self, final_url: impl Into<String>) -> Self {
        self.final_url = final_url.into();
        self
    }
}

/// Page-retrieval capability behind the crawler.
///
/// Implementations wrap a transport — plain HTTP here, a headless browser
/// elsewhere — and must stay within the per-request timeout and byte cap
/// they were configured with. Errors are returned, not panicked; the
/// crawler converts them into recorded error markers so one bad page never
/// aborts a run.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve one page.
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage>;

    /// Transport name for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}
