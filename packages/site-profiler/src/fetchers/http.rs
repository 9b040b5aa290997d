//! Plain-HTTP fetcher implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::{FetchedPage, Fetcher};

const DEFAULT_USER_AGENT: &str = "SiteProfilerBot/1.0";

/// Fetcher that retrieves pages over plain HTTP with reqwest.
///
/// Suitable for server-rendered sites; JavaScript-heavy sites need a
/// rendering transport behind the same [`Fetcher`] trait.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    byte_cap: usize,
}

impl HttpFetcher {
    /// Create a fetcher with the given per-request timeout and body cap.
    pub fn new(timeout: Duration, byte_cap: usize) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            byte_cap,
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a custom HTTP client (timeout comes with it).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        debug!(url = %url, "HTTP fetch starting");

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "HTTP request failed");
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Http(Box::new(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::BodyRead(Box::new(e))
            }
        })?;

        // Oversized bodies are truncated, not rejected; from_utf8_lossy
        // absorbs a multi-byte character split at the cap.
        let truncated = &body[..body.len().min(self.byte_cap)];
        let html = String::from_utf8_lossy(truncated).into_owned();

        debug!(url = %url, bytes = html.len(), status = status.as_u16(), "Page fetched");

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            html,
            status: status.as_u16(),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_settings() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5), 1024).with_user_agent("TestBot/0.1");
        assert_eq!(fetcher.user_agent, "TestBot/0.1");
        assert_eq!(fetcher.byte_cap, 1024);
        assert_eq!(fetcher.name(), "http");
    }
}
