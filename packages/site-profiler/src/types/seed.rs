//! Seed and pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ProfileError;

/// The crawl target for one profiling run.
///
/// Immutable once constructed; the crawl never leaves `domain`, never goes
/// deeper than `max_depth`, and never fetches more than `max_pages` pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTarget {
    /// Resolved website root URL (already expanded from any map short link).
    pub root_url: String,

    /// Host the crawl is restricted to, lower-case.
    pub domain: String,

    /// Maximum link depth from the root (0 = root only).
    pub max_depth: usize,

    /// Maximum number of pages fetched in the run.
    pub max_pages: usize,

    /// Response bodies are truncated beyond this many bytes.
    pub page_byte_cap: usize,

    /// Business name from the map listing, when the caller has one. Used
    /// as the synthesis hint and as the fallback company name.
    pub company_hint: Option<String>,
}

impl SeedTarget {
    /// Create a seed for a root URL, deriving the crawl domain from it.
    ///
    /// Fails only if the URL cannot be parsed or has no host.
    pub fn new(root_url: impl Into<String>) -> Result<Self, ProfileError> {
        let root_url = root_url.into();
        let parsed = Url::parse(&root_url).map_err(|_| ProfileError::InvalidSeed {
            url: root_url.clone(),
        })?;
        let domain = parsed
            .host_str()
            .ok_or_else(|| ProfileError::InvalidSeed {
                url: root_url.clone(),
            })?
            .to_ascii_lowercase();

        Ok(Self {
            root_url,
            domain,
            max_depth: 2,
            max_pages: 30,
            page_byte_cap: 512 * 1024,
            company_hint: None,
        })
    }

    /// Set the business-name hint.
    pub fn with_company_hint(mut self, hint: impl Into<String>) -> Self {
        self.company_hint = Some(hint.into());
        self
    }

    /// Set the maximum crawl depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the maximum page count.
    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages;
        self
    }

    /// Set the per-page body byte cap.
    pub fn with_page_byte_cap(mut self, bytes: usize) -> Self {
        self.page_byte_cap = bytes;
        self
    }
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How many pages the ranker selects for extraction.
    pub top_k_pages: usize,

    /// Concurrent fetches within one frontier depth.
    pub fetch_concurrency: usize,

    /// Per-request fetch timeout.
    pub fetch_timeout: Duration,

    /// Pause between fetch waves.
    pub politeness_delay: Duration,

    /// Wall-clock budget for the whole run. When exceeded the crawler stops
    /// accepting frontier work and later stages run on what exists.
    pub time_budget: Duration,

    /// Attempt cap for transport-level model-call retries.
    pub model_attempts: usize,

    /// Per-page cleaned-text character budget.
    pub page_char_cap: usize,

    /// Aggregate character budget across all selected pages.
    pub total_char_cap: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k_pages: 6,
            fetch_concurrency: 6,
            fetch_timeout: Duration::from_secs(20),
            politeness_delay: Duration::from_millis(100),
            time_budget: Duration::from_secs(180),
            model_attempts: 3,
            page_char_cap: 6_000,
            total_char_cap: 24_000,
        }
    }
}

impl PipelineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the selection size.
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k_pages = k;
        self
    }

    /// Set fetch concurrency.
    pub fn with_fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n.max(1);
        self
    }

    /// Set the overall wall-clock budget.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    /// Set the model retry attempt cap.
    pub fn with_model_attempts(mut self, attempts: usize) -> Self {
        self.model_attempts = attempts.max(1);
        self
    }

    /// Set the per-page and aggregate text budgets.
    pub fn with_char_caps(mut self, per_page: usize, total: usize) -> Self {
        self.page_char_cap = per_page;
        self.total_char_cap = total;
        self
    }
}
