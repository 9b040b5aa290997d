//! Testing utilities including mock implementations.
//!
//! These are useful for exercising the pipeline without network or model
//! calls: scripted responses, failure injection, and call recording.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::error::{FetchError, FetchResult, ModelError, ModelResult};
use crate::traits::ai::LanguageModel;
use crate::traits::fetcher::{FetchedPage, Fetcher};

/// A mock fetcher serving predefined pages.
///
/// URLs can be marked as permanently failing or as failing a fixed number
/// of times before succeeding (for retry-policy tests). Every fetch is
/// recorded in order.
#[derive(Default)]
pub struct MockFetcher {
    pages: RwLock<HashMap<String, FetchedPage>>,

    /// URLs that always fail with HTTP 500.
    fail_urls: RwLock<Vec<String>>,

    /// Remaining failure counts for flaky URLs.
    flaky: RwLock<HashMap<String, usize>>,

    /// Fetches in issue order.
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Create an empty mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        self.pages
            .write()
            .unwrap()
            .insert(url.clone(), FetchedPage::new(url, html.into()));
        self
    }

    /// Serve a page whose final URL differs from the requested one.
    pub fn with_redirected_page(
        self,
        url: impl Into<String>,
        final_url: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let page = FetchedPage::new(url.clone(), html.into()).with_final_url(final_url);
        self.pages.write().unwrap().insert(url, page);
        self
    }

    /// Mark a URL as always failing.
    pub fn fail_url(self, url: impl Into<String>) -> Self {
        self.fail_urls.write().unwrap().push(url.into());
        self
    }

    /// Mark a URL as failing `times` fetches before succeeding.
    pub fn flaky_url(self, url: impl Into<String>, times: usize) -> Self {
        self.flaky.write().unwrap().insert(url.into(), times);
        self
    }

    /// All fetched URLs, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times a URL was fetched.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.fail_urls.read().unwrap().iter().any(|u| u == url) {
            return Err(FetchError::Status { status: 500 });
        }

        if let Some(remaining) = self.flaky.write().unwrap().get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                });
            }
        }

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(FetchError::Status { status: 404 })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// One scripted reply from [`MockModel`].
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text.
    Text(String),

    /// Fail with a timeout (retryable).
    Timeout,

    /// Fail with an API error of this status.
    Api(u16),
}

/// A mock language model replaying scripted replies in call order.
///
/// When the script runs dry every further call times out, which drives the
/// callers onto their heuristic fallback paths — the default for tests
/// that never script anything.
#[derive(Default)]
pub struct MockModel {
    script: Mutex<VecDeque<MockReply>>,

    /// Recorded `(system, user)` prompts.
    calls: Mutex<Vec<(String, String)>>,
}

impl MockModel {
    /// Create a model with an empty script (every call fails).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text reply to the script.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(MockReply::Text(text.into()));
        self
    }

    /// Append a scripted failure.
    pub fn with_failure(self, reply: MockReply) -> Self {
        self.script.lock().unwrap().push_back(reply);
        self
    }

    /// Recorded prompts, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of completions issued.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, system: &str, user: &str) -> ModelResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));

        match self.script.lock().unwrap().pop_front() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Timeout) | None => Err(ModelError::Timeout),
            Some(MockReply::Api(status)) => Err(ModelError::Api {
                status,
                message: "mock api error".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Builder assembling a [`MockFetcher`] for a small fake site.
pub struct TestSite {
    base: String,
    fetcher: MockFetcher,
}

impl TestSite {
    /// Start a site rooted at `base` (no trailing slash).
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            fetcher: MockFetcher::new(),
        }
    }

    /// Add a page at `path` with raw HTML content.
    pub fn with_page(mut self, path: &str, html: impl Into<String>) -> Self {
        let url = format!("{}{}", self.base, path);
        self.fetcher = self.fetcher.with_page(url, html);
        self
    }

    /// Mark `path` as always failing.
    pub fn with_broken_page(mut self, path: &str) -> Self {
        let url = format!("{}{}", self.base, path);
        self.fetcher = self.fetcher.fail_url(url);
        self
    }

    /// Finish and return the fetcher.
    pub fn build(self) -> MockFetcher {
        self.fetcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_fetcher_serves_and_fails() {
        let fetcher = MockFetcher::new()
            .with_page("https://example.com/", "<html>home</html>")
            .fail_url("https://example.com/down");

        let page = fetcher.fetch("https://example.com/").await.unwrap();
        assert_eq!(page.html, "<html>home</html>");

        assert!(matches!(
            fetcher.fetch("https://example.com/down").await,
            Err(FetchError::Status { status: 500 })
        ));
        assert!(matches!(
            fetcher.fetch("https://example.com/missing").await,
            Err(FetchError::Status { status: 404 })
        ));

        assert_eq!(fetcher.calls().len(), 3);
    }

    #[tokio::test]
    async fn mock_fetcher_flaky_recovers() {
        let fetcher = MockFetcher::new()
            .with_page("https://example.com/", "ok")
            .flaky_url("https://example.com/", 2);

        assert!(fetcher.fetch("https://example.com/").await.is_err());
        assert!(fetcher.fetch("https://example.com/").await.is_err());
        assert!(fetcher.fetch("https://example.com/").await.is_ok());
        assert_eq!(fetcher.fetch_count("https://example.com/"), 3);
    }

    #[tokio::test]
    async fn mock_model_replays_script_then_times_out() {
        let model = MockModel::new()
            .with_reply("first")
            .with_failure(MockReply::Api(429));

        assert_eq!(model.complete("s", "u").await.unwrap(), "first");
        assert!(matches!(
            model.complete("s", "u").await,
            Err(ModelError::Api { status: 429, .. })
        ));
        // Script exhausted: timeout from here on.
        assert!(matches!(model.complete("s", "u").await, Err(ModelError::Timeout)));
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_site_builder() {
        let fetcher = TestSite::new("https://acme.test")
            .with_page("/", r#"<a href="/about">About</a>"#)
            .with_page("/about", "about us")
            .with_broken_page("/broken")
            .build();

        assert!(fetcher.fetch("https://acme.test/about").await.is_ok());
        assert!(fetcher.fetch("https://acme.test/broken").await.is_err());
    }
}
