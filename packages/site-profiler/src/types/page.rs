//! Page-level types produced during the crawl and selection stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A link discovered while parsing a fetched page.
///
/// Created by link extraction, consumed by the crawler to extend the
/// frontier and by the ranker as selection candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredLink {
    /// Normalized absolute URL.
    pub url: String,

    /// Page the link was found on.
    pub source_url: String,

    /// Visible anchor text, whitespace-collapsed (may be empty).
    pub anchor_text: String,

    /// Depth the link would be fetched at (source depth + 1).
    pub depth: usize,
}

/// Result of one fetch attempt.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Raw HTML, truncated to the seed's byte cap.
    Fetched(String),

    /// Error marker; the message is kept for the run log.
    Failed(String),
}

impl FetchOutcome {
    /// The HTML body, if the fetch succeeded.
    pub fn html(&self) -> Option<&str> {
        match self {
            FetchOutcome::Fetched(html) => Some(html),
            FetchOutcome::Failed(_) => None,
        }
    }

    /// Whether this outcome records a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }
}

/// One fetch attempt, successful or not. Immutable once created.
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// Normalized URL that was fetched.
    pub url: String,

    /// Depth at which the URL was dequeued.
    pub depth: usize,

    /// Body or error marker.
    pub outcome: FetchOutcome,

    /// Page title, when one was present in the HTML.
    pub title: Option<String>,

    /// When the fetch attempt completed.
    pub fetched_at: DateTime<Utc>,
}

impl PageRecord {
    /// Record a successful fetch.
    pub fn fetched(url: impl Into<String>, depth: usize, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth,
            outcome: FetchOutcome::Fetched(html.into()),
            title: None,
            fetched_at: Utc::now(),
        }
    }

    /// Record a failed fetch.
    pub fn failed(url: impl Into<String>, depth: usize, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth,
            outcome: FetchOutcome::Failed(error.into()),
            title: None,
            fetched_at: Utc::now(),
        }
    }

    /// Set the page title.
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

/// One entry of the ranker's selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedPage {
    /// Selected URL; always a member of the candidate set.
    pub url: String,

    /// Position in the selection, 0 = most relevant.
    pub rank: usize,

    /// One-line justification from the model, or the fallback marker.
    pub reason: String,
}

/// Cleaned visible text of a selected page.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Source page URL.
    pub url: String,

    /// Markup-free text, truncated to the per-page budget.
    pub text: String,

    /// Character count of `text`.
    pub char_count: usize,
}

impl ExtractedText {
    /// Build from cleaned text, recording its length.
    pub fn new(url: impl Into<String>, text: String) -> Self {
        let char_count = text.chars().count();
        Self {
            url: url.into(),
            text,
            char_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_accessors() {
        let ok = PageRecord::fetched("https://example.com/", 0, "<html></html>");
        assert!(!ok.outcome.is_error());
        assert_eq!(ok.outcome.html(), Some("<html></html>"));

        let bad = PageRecord::failed("https://example.com/x", 1, "HTTP status 404");
        assert!(bad.outcome.is_error());
        assert!(bad.outcome.html().is_none());
    }

    #[test]
    fn extracted_text_counts_chars() {
        let text = ExtractedText::new("https://example.com/", "héllo".to_string());
        assert_eq!(text.char_count, 5);
    }
}
